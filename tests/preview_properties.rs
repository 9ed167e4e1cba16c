//! Behavioural properties of the preview sync controller, driven through the
//! in-memory transport

use labelsync::payload::Reply;
use labelsync::surface::RecordingSurface;
use labelsync::{
    download_file_name, Error, Field, FieldEvent, MemoryTransport, PageBootstrap, PreviewSyncController,
    ProtocolVersion, SyncConfig, UploadedAsset,
};
use serde_json::json;

type TestController = PreviewSyncController<MemoryTransport, RecordingSurface>;

fn controller(protocol: ProtocolVersion) -> TestController {
    controller_with(protocol, MemoryTransport::new())
}

fn controller_with(protocol: ProtocolVersion, transport: MemoryTransport) -> TestController {
    let config = SyncConfig {
        base_url: "http://labels.test".to_string(),
        protocol,
        ..Default::default()
    };
    PreviewSyncController::new(&config, transport, RecordingSurface::new()).expect("Failed to create controller")
}

fn background() -> UploadedAsset {
    UploadedAsset::from_bytes("label-bg.png", b"\x89PNG\r\n\x1a\nfake".to_vec()).expect("valid asset")
}

fn sample_value(field: Field) -> &'static str {
    if field.is_color() {
        "#a1b2c3"
    } else if field.is_numeric() {
        "37"
    } else {
        "Edited"
    }
}

#[test]
fn every_field_edit_issues_exactly_one_preview_with_the_new_value() {
    for protocol in [ProtocolVersion::V1, ProtocolVersion::V2] {
        let mut c = controller(protocol);
        c.attach_background(background()).expect("attach");

        for field in Field::for_protocol(protocol) {
            let before = c.transport().request_count();
            let value = sample_value(field);
            let update = c.edit_field(field, value).expect("edit");
            assert!(update.is_some(), "{:?} did not re-render", field);
            assert_eq!(c.transport().request_count(), before + 1, "{:?} on {}", field, protocol);

            let request = c.transport().last_request().unwrap();
            let form = request.form().expect("preview is multipart");
            assert_eq!(form.get(field.name(protocol)), Some(value));
            assert!(form.file.is_some(), "background travels with every preview");
        }
    }
}

#[test]
fn upload_before_any_edit_populates_preview_and_enables_export() {
    let mut c = controller(ProtocolVersion::V2);
    assert!(!c.can_export());

    let update = c.attach_background(background()).expect("attach");
    assert_eq!(c.surface().preview_src(), Some(update.src.clone()));
    assert_eq!(c.current_file(), Some("label-bg.png"));
    assert!(c.can_export());

    c.set_field(Field::BeerName, "Hazy Daze IPA");
    let export = c.export_pdf().expect("export");
    assert_eq!(export.file_name, "hazy_daze_ipa.pdf");
    let downloads = c.surface().downloads();
    assert_eq!(downloads.len(), 1);
    assert!(downloads[0].1.starts_with(b"%PDF"));
}

#[test]
fn export_without_upload_makes_no_request() {
    let mut c = controller(ProtocolVersion::V2);
    c.set_field(Field::BeerName, "Lager");
    assert!(matches!(c.export_pdf(), Err(Error::NotUploaded)));
    assert_eq!(c.transport().request_count(), 0);
    assert_eq!(c.surface().last_alert().as_deref(), Some("Please upload an image first"));
}

#[test]
fn export_with_blank_beer_name_makes_no_request() {
    let mut c = controller(ProtocolVersion::V1);
    c.attach_background(background()).expect("attach");
    c.set_field(Field::BeerName, "   ");
    let before = c.transport().request_count();

    assert!(matches!(c.export_pdf(), Err(Error::MissingBeerName)));
    assert_eq!(c.transport().request_count(), before);
    assert_eq!(c.surface().last_alert().as_deref(), Some("Please enter a beer name"));
}

#[test]
fn download_names_replace_non_alphanumerics_and_lowercase() {
    assert_eq!(download_file_name("Old Rasputin #9"), "old_rasputin__9.pdf");
    assert_eq!(download_file_name("A/B-Test.v2"), "a_b_test_v2.pdf");
    assert_eq!(download_file_name("STOUT"), "stout.pdf");
}

#[test]
fn initial_data_populates_fields_and_percentage_labels() {
    let mut c = controller(ProtocolVersion::V2);
    let boot = PageBootstrap::from_json(json!({"beer_name": "Pale Ale", "crop_x": 30}), None).unwrap();
    c.initialize(&boot).expect("initialize");

    assert_eq!(c.draft().beer_name, "Pale Ale");
    assert_eq!(c.surface().value("beer_name").as_deref(), Some("Pale Ale"));
    assert_eq!(c.surface().text("crop_x_value").as_deref(), Some("30%"));
    assert_eq!(c.surface().text("border_color_preview").as_deref(), Some("#000000"));
    // Nothing to render without a background
    assert_eq!(c.transport().request_count(), 0);
}

#[test]
fn release_only_crop_waits_for_change_but_updates_its_label() {
    let mut c = controller(ProtocolVersion::V2);
    c.attach_background(background()).expect("attach");
    let before = c.transport().request_count();

    let fired = c.handle_event(Field::CropX, FieldEvent::Input, "70").expect("input");
    assert!(fired.is_none());
    assert_eq!(c.transport().request_count(), before);
    assert_eq!(c.surface().text("crop_x_value").as_deref(), Some("70%"));

    c.handle_event(Field::CropX, FieldEvent::Change, "70").expect("change");
    assert_eq!(c.transport().request_count(), before + 1);
}

#[test]
fn v1_fires_on_both_events_for_every_field() {
    let mut c = controller(ProtocolVersion::V1);
    c.attach_background(background()).expect("attach");
    let before = c.transport().request_count();

    c.handle_event(Field::CropX, FieldEvent::Input, "10").unwrap();
    c.handle_event(Field::CropX, FieldEvent::Change, "10").unwrap();
    assert_eq!(c.transport().request_count(), before + 2);

    // crop_y is not on the v1 form
    assert!(c.handle_event(Field::CropY, FieldEvent::Change, "10").unwrap().is_none());
    assert_eq!(c.transport().request_count(), before + 2);
}

#[test]
fn edits_before_upload_do_not_hit_the_server() {
    let mut c = controller(ProtocolVersion::V1);
    assert!(c.edit_field(Field::BeerName, "Weizen").unwrap().is_none());
    assert_eq!(c.transport().request_count(), 0);
    assert_eq!(c.draft().beer_name, "Weizen");
}

#[test]
fn server_error_alerts_and_keeps_previous_preview() {
    let transport = MemoryTransport::with_responder(|req| {
        let rejects = req
            .form()
            .and_then(|f| f.get("beer_name"))
            .map(|name| name == "bad")
            .unwrap_or(false);
        if rejects {
            Ok(Reply::from_json(400, &json!({"error": "Invalid file type"})))
        } else {
            labelsync::transport::default_reply(req)
        }
    });
    let mut c = controller_with(ProtocolVersion::V1, transport);
    let first = c.attach_background(background()).expect("attach");

    let err = c.edit_field(Field::BeerName, "bad").unwrap_err();
    assert!(matches!(err, Error::ServerError(ref m) if m == "Invalid file type"));
    assert_eq!(c.surface().last_alert().as_deref(), Some("Invalid file type"));
    assert_eq!(c.surface().preview_src(), Some(first.src.clone()));
    assert_eq!(c.preview_src(), Some(first.src.as_str()));
}

#[test]
fn transport_failure_shows_generic_alert() {
    let transport = MemoryTransport::with_responder(|_| Err(Error::NetworkError("connection refused".into())));
    let mut c = controller_with(ProtocolVersion::V2, transport);
    assert!(matches!(c.attach_background(background()), Err(Error::NetworkError(_))));
    assert_eq!(
        c.surface().last_alert().as_deref(),
        Some("An error occurred while generating the preview")
    );
    assert!(c.surface().preview_src().is_none());
    assert!(!c.can_export());
}

#[test]
fn v1_pdf_request_is_json_with_stored_filename() {
    let mut c = controller(ProtocolVersion::V1);
    c.attach_background(background()).expect("attach");
    c.set_field(Field::BeerName, "Red");
    c.set_field(Field::Subtitle, "Brewhouse");
    c.export_pdf().expect("export");

    let request = c.transport().last_request().unwrap();
    assert_eq!(request.url, "http://labels.test/generate-pdf");
    let body = request.json().expect("v1 PDF body is JSON");
    assert_eq!(body["filename"], "label-bg.png");
    assert_eq!(body["label_data"]["brewer_name"], "Brewhouse");
    assert_eq!(body["label_data"]["image_x"], 50);
}
