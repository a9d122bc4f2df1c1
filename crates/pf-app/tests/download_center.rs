mod support;

use std::sync::Arc;

use pf_app::usecases::{DownloadCenter, DownloadError};
use pf_core::download::{format_file_size, CompletedRun};
use pf_core::ids::ModelId;
use support::FixedClock;

fn center() -> DownloadCenter {
    DownloadCenter::with_samples(Arc::new(FixedClock(1_731_000_000_000)))
}

#[test]
fn sample_catalogue_has_current_model_and_history() {
    let center = center();
    let current = center.current().unwrap();
    assert_eq!(current.id.as_str(), "model_2024_001");
    assert_eq!(format_file_size(current.file_size), "15 MB");
    assert_eq!(center.history().len(), 6);
    assert!(center
        .history()
        .windows(2)
        .all(|w| w[0].created_at > w[1].created_at));
}

#[test]
fn prepares_stl_downloads() {
    let center = center();

    let ticket = center
        .prepare_download(&ModelId::from("model_2024_001"))
        .unwrap();
    assert_eq!(ticket.file_name, "Custom figurine model.stl");
    assert_eq!(ticket.url, "/downloads/custom-figurine-model.stl");

    let ticket = center
        .prepare_download(&ModelId::from("model_2024_002"))
        .unwrap();
    assert_eq!(ticket.url, "/downloads/miniature-house.stl");

    assert!(matches!(
        center.prepare_download(&ModelId::from("nope")),
        Err(DownloadError::NotFound(_))
    ));
}

#[test]
fn completed_run_becomes_the_current_model() {
    let mut center = center();
    let run = CompletedRun {
        file_name: "sketch_design_v2.png".into(),
        file_size: 2_457_600,
        processing_time_secs: 155,
    };

    let id = center.record_completed_run(&run).id.clone();

    let current = center.current().unwrap();
    assert_eq!(current.id, id);
    assert_eq!(current.name, "sketch_design_v2 model");
    assert_eq!(center.history()[0].id.as_str(), "model_2024_001");
    assert_eq!(center.history().len(), 7);
    let ticket = center.prepare_download(&id).unwrap();
    assert_eq!(ticket.file_name, "sketch_design_v2 model.stl");
}

#[test]
fn share_text_names_the_model() {
    let share = center()
        .share_text(&ModelId::from("model_2024_003"))
        .unwrap();
    assert_eq!(share.title, "PrintForge AI - Mechanical part prototype");
    assert!(share.text.ends_with("Mechanical part prototype"));
}

#[test]
fn delete_removes_from_current_or_history() {
    let mut center = center();

    center.delete(&ModelId::from("model_2024_004")).unwrap();
    assert_eq!(center.history().len(), 5);

    center.delete(&ModelId::from("model_2024_001")).unwrap();
    assert!(center.current().is_none());

    assert!(center.delete(&ModelId::from("model_2024_001")).is_err());
}
