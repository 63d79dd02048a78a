use migration_tracker_core::{
    Aggregator, Classification, FileRetention, GroupBy, Parser, ScanArgs, Source, PATTERNS,
    classify_file, execute_scan_flow,
};
use std::fs;
use std::path::Path;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[tokio::test]
async fn local_scan_writes_results_json() {
    let dir = tempfile::tempdir().unwrap();
    let app = dir.path().join("app");
    write(
        &app,
        "docker/views/containers.controller.js",
        "/* @ngInject */\nangular.module('portainer.docker').controller('ContainersController', ContainersController);\n",
    );
    write(&app, "docker/views/containers.html", "<rd-widget></rd-widget>");
    write(
        &app,
        "portainer/components/index.js",
        "import angular from 'angular';\n\
         angular.module('portainer.app').component('a', {});\n\
         angular.module('portainer.app').component('b', {});\n",
    );
    write(
        &app,
        "react/portainer/Widget.tsx",
        "import { PropsWithChildren } from 'react';\nexport function Widget() { return <Box />; }\n",
    );
    write(&app, "react/docker/utils.ts", "export const noop = () => {};\n");
    write(&app, "node_modules/angular/angular.controller.js", "");

    let output = dir.path().join("out").join("results.json");
    let args = ScanArgs::parse_from([
        "migration-tracker",
        "local",
        app.to_str().unwrap(),
        "--output",
        output.to_str().unwrap(),
        "--most-changed-limit",
        "0",
        "--files",
        "legacy",
    ]);

    let results = execute_scan_flow(args).await.unwrap();
    let summary = &results.summary;
    assert_eq!(summary.legacy_templates, 1);
    assert_eq!(summary.legacy_files, 2);
    assert_eq!(summary.modern_files, 1);
    assert_eq!(summary.controller_files, 1);
    assert_eq!(summary.controller_registrations, 1);
    assert_eq!(summary.component_registrations, 2);
    assert_eq!(summary.ng_inject_annotations, 1);
    assert_eq!(summary.files_with_angular_import, 1);
    assert!(results.most_changed_html_files.is_none());

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(json["source"], "local");
    assert_eq!(json["byModule"]["docker"]["angularJSFiles"], 1);
    assert_eq!(json["byModule"]["portainer"]["angularJSFiles"], 1);
    assert_eq!(json["byModule"]["react/portainer"]["reactFiles"], 1);
    assert!(json["byModule"].get("react/docker").is_none());
    assert_eq!(json["files"].as_array().unwrap().len(), 2);
    assert_eq!(json["files"][0]["patterns"]["controllers"], 1);
    assert_eq!(json["files"][0]["patterns"]["controllerFile"], true);
}

#[tokio::test]
async fn missing_local_root_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");
    let output = dir.path().join("results.json");
    let args = ScanArgs::parse_from([
        "migration-tracker",
        "local",
        missing.to_str().unwrap(),
        "-o",
        output.to_str().unwrap(),
    ]);

    assert!(execute_scan_flow(args).await.is_err());
    assert!(!output.exists());
}

#[test]
fn documented_scenarios() {
    let mut aggregator = Aggregator::new(Source::Local, GroupBy::Module, FileRetention::None);

    let controller = classify_file(
        "/* @ngInject */\nangular.module('x').controller('Foo', Foo);",
        "app/docker/foo.controller.js",
        "app",
        &PATTERNS,
        "react",
    );
    assert_eq!(controller.classification, Classification::Legacy);
    assert_eq!(controller.module, "docker");
    aggregator.record(&controller);

    let widget = classify_file(
        "import React from 'react';\nconst x = <Widget>hi</Widget>;",
        "app/react/portainer/Widget.tsx",
        "app",
        &PATTERNS,
        "react",
    );
    assert_eq!(widget.classification, Classification::Modern);
    assert_eq!(widget.module, "react/portainer");
    aggregator.record(&widget);

    let template = classify_file("<div></div>", "app/foo.html", "", &PATTERNS, "react");
    assert_eq!(template.classification, Classification::Template);
    aggregator.record(&template);

    let summary = aggregator.summary().clone();
    assert_eq!(summary.controller_files, 1);
    assert_eq!(summary.controller_registrations, 1);
    assert_eq!(summary.ng_inject_annotations, 1);
    assert_eq!(summary.legacy_files, 1);
    assert_eq!(summary.modern_files, 1);
    assert_eq!(summary.legacy_templates, 1);

    let results = aggregator.finalize();
    let breakdown = results.breakdown();
    assert_eq!(breakdown.len(), 2);
    assert_eq!(breakdown["docker"].legacy_files, 1);
    assert_eq!(breakdown["react/portainer"].modern_files, 1);
}
