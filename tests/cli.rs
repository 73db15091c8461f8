mod common;

use assert_cmd::Command;
use common::{TestWorkspace, text_row};
use predicates::prelude::*;
use serde_json::Value;

const DEFINITIONS: &str = "name,type,required,maxLength\n\
sku,text,yes,32\n\
title,text,yes,\n\
color,enum,no,\n";

const PRODUCTS: &str = "Item Code,Name,Colour\n\
A1,Shirt,Blue\n\
\n\
A2,Pants,Black\n\
A3,Socks,\n";

fn mapper(workspace: &TestWorkspace) -> Command {
    let mut cmd = Command::cargo_bin("catalog-mapper").expect("binary exists");
    cmd.arg("--store").arg(workspace.store());
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(output).expect("utf8 stdout")
}

fn create_template(workspace: &TestWorkspace) -> String {
    let definitions = workspace.write("apparel.csv", DEFINITIONS);
    let id = stdout_of(
        mapper(workspace)
            .args(["template", "create", "--definitions", "--name", "Apparel", "-i"])
            .arg(&definitions),
    );
    id.trim().to_string()
}

fn json(cmd: &mut Command) -> Value {
    serde_json::from_str(&stdout_of(cmd)).expect("valid json")
}

#[test]
fn template_create_prints_id_and_show_lists_attributes() {
    let workspace = TestWorkspace::new();
    let id = create_template(&workspace);
    assert_eq!(id.len(), 36, "expected a uuid, got {id:?}");

    let template = json(
        mapper(&workspace)
            .args(["template", "show", &id, "--format", "json"]),
    );
    assert_eq!(template["name"], "Apparel");
    let attributes = template["attributes"].as_array().expect("attributes");
    assert_eq!(attributes.len(), 3);
    assert_eq!(attributes[0]["name"], "sku");
    assert_eq!(attributes[0]["required"], true);
    assert_eq!(attributes[0]["maxLength"], 32);
    assert_eq!(attributes[2]["type"], "enum");

    mapper(&workspace)
        .args(["template", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Apparel"));
}

#[test]
fn map_rejects_missing_required_and_saves_nothing() {
    let workspace = TestWorkspace::new();
    let template = create_template(&workspace);
    let products = workspace.write("products.csv", PRODUCTS);

    mapper(&workspace)
        .args(["map", "-t", &template, "-a", "Item Code=sku", "-i"])
        .arg(&products)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing required mappings: title"));

    let mappings = json(mapper(&workspace).args(["mapping", "list", "--format", "json"]));
    assert_eq!(mappings.as_array().map(Vec::len), Some(0));
}

#[test]
fn map_with_unknown_column_is_invalid_input() {
    let workspace = TestWorkspace::new();
    let template = create_template(&workspace);
    let products = workspace.write("products.csv", PRODUCTS);

    mapper(&workspace)
        .args(["map", "-t", &template, "-a", "Barcode=sku", "-i"])
        .arg(&products)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a column"));
}

#[test]
fn map_commits_and_stats_sum_counts() {
    let workspace = TestWorkspace::new();
    let template = create_template(&workspace);
    let products = workspace.write("products.csv", PRODUCTS);

    mapper(&workspace)
        .args(["map", "-t", &template, "-i"])
        .arg(&products)
        .args(["-a", "Item Code=sku", "-a", "Name=title", "--dry-run"])
        .assert()
        .success();
    let mappings = json(mapper(&workspace).args(["mapping", "list", "--format", "json"]));
    assert_eq!(mappings.as_array().map(Vec::len), Some(0));

    let saved = stdout_of(
        mapper(&workspace)
            .args(["map", "-t", &template, "-i"])
            .arg(&products)
            .args(["-a", "Item Code=sku", "-a", "Name=title", "-a", "Colour=color"]),
    );
    let record_id = saved.lines().last().expect("record id").trim().to_string();

    let mappings = json(mapper(&workspace).args(["mapping", "list", "--format", "json"]));
    let records = mappings.as_array().expect("array");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["id"], record_id.as_str());
    assert_eq!(records[0]["file_name"], "products.csv");
    assert_eq!(records[0]["template_name"], "Apparel");
    assert_eq!(records[0]["mapping_count"], 3);
    assert_eq!(records[0]["product_count"], 3);
    assert_eq!(records[0]["mappings"]["Colour"], "color");

    let stats = json(mapper(&workspace).args(["stats", "--format", "json"]));
    assert_eq!(stats["templates"], 1);
    assert_eq!(stats["uploaded_files"], 1);
    assert_eq!(stats["active_mappings"], 3);
    assert_eq!(stats["products_mapped"], 3);

    mapper(&workspace)
        .args(["mapping", "delete", &record_id])
        .assert()
        .success();
    mapper(&workspace)
        .args(["mapping", "delete", &record_id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn auto_mapping_matches_snake_cased_headers() {
    let workspace = TestWorkspace::new();
    let template = create_template(&workspace);
    let products = workspace.write("feed.csv", "SKU,Title,Color\nA1,Shirt,Red\n");

    mapper(&workspace)
        .args(["map", "--auto", "-t", &template, "-i"])
        .arg(&products)
        .assert()
        .success();

    let mappings = json(mapper(&workspace).args(["mapping", "list", "--format", "json"]));
    assert_eq!(mappings[0]["mapping_count"], 3);
    assert_eq!(mappings[0]["mappings"]["Title"], "title");
}

#[test]
fn inspect_reports_columns_of_first_sheet() {
    let workspace = TestWorkspace::new();
    let workbook = workspace.write_xlsx(
        "catalog.xlsx",
        &[
            (
                "Products",
                vec![
                    text_row(&["sku", "title"]),
                    text_row(&["A1", "Shirt"]),
                    text_row(&["A2", "Pants"]),
                ],
            ),
            ("Notes", vec![text_row(&["ignored"])]),
        ],
    );

    let report = json(
        mapper(&workspace)
            .args(["inspect", "--rows", "1", "--format", "json", "-i"])
            .arg(&workbook),
    );
    assert_eq!(report["file"], "catalog.xlsx");
    assert_eq!(report["columns"], serde_json::json!(["sku", "title"]));
    assert_eq!(report["row_count"], 2);
    assert_eq!(report["rows"][0]["title"], "Shirt");
}

#[test]
fn oversized_upload_is_rejected() {
    let workspace = TestWorkspace::new();
    let products = workspace.write("products.csv", PRODUCTS);

    mapper(&workspace)
        .args(["--max-file-size", "8", "inspect", "-i"])
        .arg(&products)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid input"));
}

#[test]
fn unsupported_extension_is_rejected() {
    let workspace = TestWorkspace::new();
    let notes = workspace.write("notes.txt", PRODUCTS);

    mapper(&workspace)
        .args(["inspect", "-i"])
        .arg(&notes)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported file type"));
}

#[test]
fn deleting_unknown_template_fails() {
    let workspace = TestWorkspace::new();
    mapper(&workspace)
        .args([
            "template",
            "delete",
            "00000000-0000-4000-8000-000000000000",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn inspect_ignores_an_unreadable_store() {
    let workspace = TestWorkspace::new();
    std::fs::create_dir_all(workspace.store()).expect("store dir");
    std::fs::write(workspace.store().join("catalog.json"), "{ broken").expect("corrupt store");
    let products = workspace.write("products.csv", PRODUCTS);

    mapper(&workspace)
        .args(["inspect", "-i"])
        .arg(&products)
        .assert()
        .success()
        .stdout(predicate::str::contains("3 row(s)"));

    mapper(&workspace)
        .args(["stats"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Opening catalog store"));
}

#[test]
fn inspect_preview_clips_wide_cells() {
    let workspace = TestWorkspace::new();
    let products = workspace.write(
        "products.csv",
        "sku,title\nA1,Organic cotton crew neck shirt\n",
    );

    mapper(&workspace)
        .args(["inspect", "--rows", "1", "--cell-width", "8", "-i"])
        .arg(&products)
        .assert()
        .success()
        .stdout(predicate::str::contains("Organic…"))
        .stdout(predicate::str::contains("crew neck").not());
}

#[test]
fn two_runs_against_one_store_keep_both_mappings() {
    let workspace = TestWorkspace::new();
    let template = create_template(&workspace);
    let first = workspace.write("first.csv", PRODUCTS);
    let second = workspace.write("second.csv", PRODUCTS);

    for file in [&first, &second] {
        mapper(&workspace)
            .args(["map", "-t", &template, "-a", "Item Code=sku", "-a", "Name=title", "-i"])
            .arg(file)
            .assert()
            .success();
    }

    let mappings = json(mapper(&workspace).args(["mapping", "list", "--format", "json"]));
    let names = mappings
        .as_array()
        .expect("array")
        .iter()
        .map(|m| m["file_name"].as_str().unwrap_or_default().to_string())
        .collect::<Vec<_>>();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"first.csv".to_string()));
    assert!(names.contains(&"second.csv".to_string()));
}
