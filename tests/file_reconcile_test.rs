use analytics_engine::adapters::{load_dataset, render_report, write_output};
use analytics_engine::config::ReportFormat;
use analytics_engine::{reconcile, ReconcileRequest};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_reconcile_json_against_csv() {
    let temp_dir = TempDir::new().unwrap();
    let sap = temp_dir.path().join("sap.json");
    let dian = temp_dir.path().join("dian.csv");
    fs::write(
        &sap,
        r#"[{"U_CUFE": "ab-1", "Total": 100}, {"U_CUFE": "AB-2", "Total": 250}]"#,
    )
    .unwrap();
    fs::write(&dian, "cufe,Issuer\n AB-1 ,ACME\nab-3,Globex\n").unwrap();

    let request = ReconcileRequest {
        key_column_a: Some("u_cufe".to_string()),
        key_column_b: Some("CUFE".to_string()),
        mode: Some("missing_in_a".to_string()),
        ..ReconcileRequest::new(load_dataset(&sap).unwrap(), load_dataset(&dian).unwrap())
    };
    let result = reconcile(&request).unwrap();
    assert_eq!(result.key_column_a, "U_CUFE");
    assert_eq!(result.key_column_b, "cufe");
    assert_eq!(result.match_count, 1);

    let csv = render_report(&result, ReportFormat::Csv).unwrap();
    assert_eq!(csv, "cufe,Issuer\nab-3,Globex\n");

    let output = temp_dir.path().join("out/report.json");
    let json = render_report(&result, ReportFormat::Json).unwrap();
    write_output(&output, &json).unwrap();

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written["match_count"], serde_json::json!(1));
    assert_eq!(written["metadata"]["total_records_b"], serde_json::json!(2));
}

#[test]
fn test_csv_keys_keep_leading_zeros() {
    let temp_dir = TempDir::new().unwrap();
    let erp = temp_dir.path().join("erp.csv");
    let portal = temp_dir.path().join("portal.json");
    fs::write(&erp, "CUFE,amt\n0012,5\n123456789012345678901234,7\n").unwrap();
    fs::write(
        &portal,
        r#"[{"CUFE": "0012"}, {"CUFE": "123456789012345678901234"}, {"CUFE": "12"}]"#,
    )
    .unwrap();

    let request = ReconcileRequest {
        mode: Some("intersection".to_string()),
        ..ReconcileRequest::new(load_dataset(&erp).unwrap(), load_dataset(&portal).unwrap())
    };
    let result = reconcile(&request).unwrap();
    assert_eq!(result.match_count, 2);

    let csv = render_report(&result, ReportFormat::Csv).unwrap();
    assert_eq!(csv, "CUFE,amt\n0012,5\n123456789012345678901234,7\n");
}
