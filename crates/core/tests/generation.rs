//! Whole-project generation against a temporary directory.

use std::fs;
use std::path::Path;

use cgen_core::{FileStatus, Generator, Mode, Severity, codes};
use cgen_settings::load_settings;

const SETTINGS: &str = r#"{
    // output lands in <project>/ADB
    "subsystem_name": "ADB",
    "subdirectories": ["HAL"],
    "log_file": "cgen.log",
    "files_to_generate": [
        { "filename": "parameters.c" },
        /* separate catalog for the HAL header */
        { "filename": "HAL/ids.h", "base_template": "ids.cgen_template", "parameters": "hal_params.csv" }
    ]
}"#;

const CATALOG: &str = "# id,name,dataType,defaultValue\n10,LED_MODE,uint16_t,0xCAFE\n\n2,FAN,uint32_t,1\n";

const PARAMETERS_C: &str = r#"//< parameter table and init hooks
$vars$ names.csv
#include "s#name_params.h"

static const param_t PREFIX_table[] = {
$p-line$[all]     { p#hexId, "p#name", p#dataType },
};

void s#name_init(void) {
    $p-template$[LED_MODE] led_init.cgen_template
    $p-template$[FAN] fan_init.cgen_template
}"#;

fn write(dir: &Path, name: &str, text: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, text).unwrap();
}

fn project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "settings.json", SETTINGS);
    write(root, "params.csv", CATALOG);
    write(root, "hal_params.csv", "1,HAL_CLOCK,uint32_t,8000000\n");
    write(root, "templates/parameters.c.cgen_template", PARAMETERS_C);
    write(root, "templates/names.csv", "PREFIX, adb\n");
    write(root, "templates/led_init.cgen_template", "p#name_configure(p#defaultValue);");
    write(root, "templates/ids.cgen_template", "$p-line$[all] #define p#name p#id");
    dir
}

#[test]
fn full_project_generates_and_stubs_missing_templates() {
    let dir = project();
    let root = dir.path();
    let settings = load_settings(&root.join("settings.json")).unwrap();

    let mut progress = Vec::new();
    let report = Generator::new(&settings, root, Mode::Write)
        .run_with(|f| progress.push(f.filename.clone()))
        .unwrap();
    assert_eq!(progress, ["parameters.c", "HAL/ids.h"]);
    assert!(report.files.iter().all(|f| f.status == FileStatus::Written));

    let expected = "#include \"ADB_params.h\"\n\
                    \n\
                    static const param_t adb_table[] = {\n\
                    \x20   { 0x2, \"FAN\", uint32_t },\n\
                    \x20   { 0xa, \"LED_MODE\", uint16_t },\n\
                    };\n\
                    \n\
                    void ADB_init(void) {\n\
                    \x20   LED_MODE_configure(0xCAFE);\n\
                    \x20   // Add FAN code section here!\n\
                    }\n";
    assert_eq!(fs::read_to_string(root.join("ADB/parameters.c")).unwrap(), expected);
    assert_eq!(
        fs::read_to_string(root.join("ADB/HAL/ids.h")).unwrap(),
        "#define HAL_CLOCK 1\n"
    );

    let main = &report.files[0];
    assert_eq!(main.line_count, 11);
    assert_eq!(main.stubs.len(), 1);
    assert!(main.stubs[0].ends_with("fan_init.cgen_template"));
    assert_eq!(
        fs::read_to_string(root.join("templates/fan_init.cgen_template")).unwrap(),
        ""
    );
    let ids: Vec<_> = main.diagnostics.iter().map(|d| &*d.id).collect();
    assert_eq!(ids, [codes::MISSING_PARAM_TEMPLATE]);

    let log = fs::read_to_string(root.join("cgen.log")).unwrap();
    assert!(log.contains(codes::MISSING_PARAM_TEMPLATE), "{log}");
    assert!(log.contains("wrote 11 lines to"), "{log}");
    assert!(log.contains("wrote 1 lines to"), "{log}");
}

#[test]
fn second_run_sees_blank_stub_and_existing_directories() {
    let dir = project();
    let root = dir.path();
    let settings = load_settings(&root.join("settings.json")).unwrap();
    let generator = Generator::new(&settings, root, Mode::Write);

    let first = generator.run().unwrap();
    let second = generator.run().unwrap();
    assert_eq!(first.files[0].lines, second.files[0].lines);
    assert!(second.files[0].stubs.is_empty());

    let empty = second.files[0]
        .diagnostics
        .iter()
        .find(|d| d.id == codes::EMPTY_PARAM_TEMPLATE)
        .expect("empty template reported");
    assert_eq!(empty.severity, Severity::Info);

    let existing = second
        .diagnostics
        .iter()
        .filter(|d| d.id == codes::DIRECTORY_EXISTS)
        .count();
    assert_eq!(existing, 2);
    assert!(!second.has_errors());
}

#[test]
fn unreadable_file_catalog_is_reported_for_that_file() {
    let dir = project();
    let root = dir.path();
    fs::remove_file(root.join("hal_params.csv")).unwrap();
    let settings = load_settings(&root.join("settings.json")).unwrap();

    let report = Generator::new(&settings, root, Mode::DryRun).run().unwrap();
    let hal = &report.files[1];
    assert_eq!(hal.status, FileStatus::Checked);
    assert!(hal.lines.is_empty());
    assert_eq!(hal.diagnostics[0].id, codes::CATALOG_UNREADABLE);
    assert!(report.has_errors());
    assert!(!root.join("ADB").exists());
    assert!(!root.join("cgen.log").exists());
}
