use anyhow::Result;
use facematch::catalog::Catalog;
use facematch::session::{Outcome, Session, Watcher};
use facematch::source::JsonLinesSource;
use facematch::{Identity, Threshold};
use std::time::Duration;

fn scratch_catalog() -> Catalog {
    Catalog::open(std::env::temp_dir().join(format!("facematch-it-{}", uuid::Uuid::new_v4())))
}

/// Catalog entries flow through a session snapshot into match results
#[test]
fn test_catalog_to_match() -> Result<()> {
    env_logger::try_init().ok();
    let catalog = scratch_catalog();
    let rahim = catalog.add("Rahim", "https://img.example/rahim.jpg", vec![0.1, 0.0, 0.0])?;
    catalog.add("Karim", "https://img.example/karim.jpg", vec![0.9, 0.9, 0.0])?;

    let session = Session::new(catalog.references()?, Threshold::new(0.5)?);
    let queries = "[0.0, 0.0, 0.0]\n[0.9, 0.8, 0.0]\nnull\n[5.0, 5.0, 5.0]\n";
    let mut frames = JsonLinesSource::new(queries.as_bytes());

    let mut identities = Vec::new();
    let cycles = Watcher::new(Duration::ZERO).run(&session, &mut frames, |_, o| {
        identities.push(match o {
            Outcome::Matched(obs) => obs.result.identity.to_string(),
            Outcome::NoFace => "No face".to_string(),
            Outcome::Rejected(e) => e.to_string(),
        })
    });
    assert_eq!(cycles, 4);
    assert_eq!(identities, vec!["Rahim", "Karim", "No face", "Unknown"]);

    // renaming is picked up on the next refresh, not before
    catalog.rename(&rahim.id, "Rahim Uddin")?;
    let obs = session.observe(&facematch::Embedding::new(vec![0.0, 0.0, 0.0])?)?;
    assert_eq!(obs.result.identity, Identity::Known("Rahim".into()));

    session.refresh(catalog.references()?);
    let obs = session.observe(&facematch::Embedding::new(vec![0.0, 0.0, 0.0])?)?;
    assert_eq!(obs.result.identity, Identity::Known("Rahim Uddin".into()));
    assert!((obs.confidence - 90.0).abs() < 1e-3);

    catalog.purge()?;
    Ok(())
}

/// A catalog holding mixed dimensions fails matches but not the session
#[test]
fn test_mixed_dimensions_in_catalog() -> Result<()> {
    let catalog = scratch_catalog();
    catalog.add("A", "a.jpg", vec![0.0, 0.0])?;
    catalog.add("B", "b.jpg", vec![0.0, 0.0, 0.0])?;

    let session = Session::new(catalog.references()?, Threshold::new(0.5)?);
    let query = facematch::Embedding::new(vec![0.0, 0.0])?;
    assert!(session.observe(&query).is_err());

    let bad = catalog.list()?[1].id.clone();
    assert!(catalog.remove(&bad)?);
    session.refresh(catalog.references()?);
    assert!(session.observe(&query)?.result.is_known());

    catalog.purge()?;
    Ok(())
}

/// Frames ahead of a malformed line are matched and the stream keeps going
#[test]
fn test_malformed_query_line_does_not_abort_watch() -> Result<()> {
    let catalog = scratch_catalog();
    catalog.add("A", "a.jpg", vec![0.0, 0.0])?;
    let session = Session::new(catalog.references()?, Threshold::new(0.5)?);

    let path = catalog.dir().join("queries.jsonl");
    std::fs::write(&path, "[0.0, 0.0]\n{bad}\n[0.1, 0.0]\nnot json")?;
    let mut frames = JsonLinesSource::open(&path)?;

    let mut identities = Vec::new();
    let cycles = Watcher::new(Duration::ZERO).run(&session, &mut frames, |_, o| {
        if let Outcome::Matched(obs) = o {
            identities.push(obs.result.identity.clone());
        }
    });
    assert_eq!(cycles, 2);
    assert_eq!(
        identities,
        vec![Identity::Known("A".into()), Identity::Known("A".into())]
    );
    assert_eq!(frames.skipped(), 2);

    catalog.purge()?;
    Ok(())
}
