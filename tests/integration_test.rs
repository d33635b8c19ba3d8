// Integration tests for infragraph

use assert_cmd::Command;
use infragraph::analysis::{Edge, NO_FILES_REASON};
use infragraph::output::{DiagramGenerator, COMMENT_MARKER, MARKDOWN_FILE, MERMAID_FILE, NETWORK_FILE};
use infragraph::{Analyzer, Config, Error, IacFormat};
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn fixtures_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

// Helper to create an analyzer with default config
fn create_analyzer() -> Analyzer {
    let config = Config::default();
    Analyzer::new(config).expect("Failed to create analyzer")
}

fn infragraph() -> Command {
    Command::cargo_bin("infragraph").expect("binary is built")
}

// ============================================================================
// Terraform
// ============================================================================

#[test]
fn test_terraform_network_edges() {
    let result = create_analyzer()
        .analyze(&fixtures_path("terraform_network"))
        .expect("Analysis failed");

    assert_eq!(result.format, IacFormat::Terraform);
    assert_eq!(result.graph.resources.len(), 4);
    assert!(!result.used_fallback);
    assert!(result.parse_errors.is_empty(), "{:?}", result.parse_errors);

    let edges = &result.graph.edges;
    assert!(edges.contains(&Edge::new("aws_vpc.main", "aws_subnet.app")));
    assert!(edges.contains(&Edge::new("aws_subnet.app", "aws_instance.web")));
    assert!(edges.contains(&Edge::new("aws_instance.web", "aws_s3_bucket.logs")));
    assert_eq!(edges.len(), 3);
}

#[test]
fn test_terraform_network_hierarchy() {
    let result = create_analyzer()
        .analyze(&fixtures_path("terraform_network"))
        .expect("Analysis failed");

    let group = &result.hierarchy["aws_vpc.main"];
    assert_eq!(group.subnets["aws_subnet.app"], vec!["aws_instance.web"]);
    assert!(group.other.is_empty());
    assert_eq!(result.hierarchy.len(), 1);
}

#[test]
fn test_environment_prefixing() {
    let result = create_analyzer()
        .analyze(&fixtures_path("environments"))
        .expect("Analysis failed");

    let ids: Vec<&str> = result.graph.resources.keys().map(String::as_str).collect();
    assert_eq!(
        ids,
        vec!["aws_subnet.dev__a", "aws_subnet.prod__a", "aws_vpc.dev__main", "aws_vpc.prod__main"]
    );

    let edges = &result.graph.edges;
    assert!(edges.contains(&Edge::new("aws_vpc.dev__main", "aws_subnet.dev__a")));
    assert!(edges.contains(&Edge::new("aws_vpc.prod__main", "aws_subnet.prod__a")));
    assert!(!edges.contains(&Edge::new("aws_vpc.prod__main", "aws_subnet.dev__a")));
    assert_eq!(edges.len(), 2);

    let dev_vpc = &result.graph.resources["aws_vpc.dev__main"];
    assert_eq!(dev_vpc.label(), "aws_vpc.main");
    assert_eq!(dev_vpc.origin.environment.as_deref(), Some("dev"));
}

#[test]
fn test_fallback_chain() {
    let result = create_analyzer()
        .analyze(&fixtures_path("no_references"))
        .expect("Analysis failed");

    assert!(result.used_fallback);
    let edges: Vec<&Edge> = result.graph.edges.iter().collect();
    assert_eq!(
        edges,
        vec![
            &Edge::new("aws_s3_bucket.a", "aws_s3_bucket.b"),
            &Edge::new("aws_s3_bucket.b", "aws_s3_bucket.c"),
        ]
    );
}

#[test]
fn test_graph_build_is_idempotent() {
    let analyzer = create_analyzer();
    let first = analyzer.analyze(&fixtures_path("terraform_network")).unwrap();
    let second = analyzer.analyze(&fixtures_path("terraform_network")).unwrap();
    assert_eq!(first.graph.edges, second.graph.edges);
    assert_eq!(first.hierarchy, second.hierarchy);
}

#[test]
fn test_module_directory_not_loaded_twice() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("live")).unwrap();
    fs::create_dir_all(root.join("modules/vpc")).unwrap();
    fs::write(
        root.join("live/main.tf"),
        "module \"net\" {\n  source = \"../modules/vpc\"\n}\n\nresource \"aws_instance\" \"x\" {}\n",
    )
    .unwrap();
    fs::write(root.join("modules/vpc/main.tf"), "resource \"aws_vpc\" \"this\" {}\n").unwrap();

    let result = create_analyzer().analyze(root).expect("Analysis failed");
    let ids: Vec<&str> = result.graph.resources.keys().map(String::as_str).collect();
    assert_eq!(ids, vec!["aws_instance.x", "aws_vpc.module_net__this"]);
}

// ============================================================================
// Other formats
// ============================================================================

#[test]
fn test_cloudformation_edges() {
    let result = create_analyzer()
        .analyze(&fixtures_path("cloudformation"))
        .expect("Analysis failed");

    assert_eq!(result.format, IacFormat::CloudFormation);
    assert!(result.graph.edges.contains(&Edge::new("Role", "Func")));
    assert!(result.graph.edges.contains(&Edge::new("Func", "Alarm")));
    assert!(!result.used_fallback);
}

#[test]
fn test_bicep_hierarchy() {
    let result = create_analyzer()
        .analyze(&fixtures_path("bicep"))
        .expect("Analysis failed");

    assert_eq!(result.format, IacFormat::Bicep);
    assert!(result.graph.edges.contains(&Edge::new("vnet", "subnet")));
    assert!(result.graph.edges.contains(&Edge::new("subnet", "nic")));
    assert_eq!(result.hierarchy["vnet"].subnets["subnet"], vec!["nic"]);
}

#[test]
fn test_pulumi_edges() {
    let result = create_analyzer()
        .analyze(&fixtures_path("pulumi"))
        .expect("Analysis failed");

    assert_eq!(result.format, IacFormat::Pulumi);
    let edges = &result.graph.edges;
    assert!(edges.contains(&Edge::new("bucket", "site")));
    assert!(edges.contains(&Edge::new("bucket", "policy")));
    assert!(edges.contains(&Edge::new("site", "policy")));
}

#[test]
fn test_changed_files_select_format() {
    let root = fixtures_path("");
    let changed = vec!["cloudformation/stack.cfn.yaml".to_string()];
    let result = create_analyzer().analyze_changed(&root, &changed).unwrap();
    assert_eq!(result.format, IacFormat::CloudFormation);
    assert_eq!(result.graph.resources.len(), 3);
}

// ============================================================================
// Output
// ============================================================================

#[test]
fn test_diagram_generation() {
    let result = create_analyzer()
        .analyze(&fixtures_path("terraform_network"))
        .unwrap();
    let mermaid = DiagramGenerator::new().generate_dependency_graph(&result);

    assert!(mermaid.starts_with("flowchart LR\n"));
    assert!(mermaid.contains("subgraph AWS[AWS]"));
    assert!(mermaid.contains("tf_aws_vpc_main --> tf_aws_subnet_app"));
}

#[test]
fn test_environment_diagram_groups() {
    let result = create_analyzer()
        .analyze(&fixtures_path("environments"))
        .unwrap();
    let mermaid = DiagramGenerator::new().generate_dependency_graph(&result);

    assert!(mermaid.contains("subgraph env_dev[Dev]"));
    assert!(mermaid.contains("subgraph env_prod[Prod]"));
}

// ============================================================================
// Error Handling Tests
// ============================================================================

#[test]
fn test_analyze_nonexistent_path() {
    let result = create_analyzer().analyze(&PathBuf::from("/nonexistent/path"));
    assert!(matches!(result, Err(Error::PathNotFound(_))));
}

#[test]
fn test_analyze_empty_directory() {
    let empty_dir = TempDir::new().expect("Failed to create temp dir");
    let result = create_analyzer().analyze(empty_dir.path());

    match result {
        Err(Error::NoFormatMatched(reason)) => assert_eq!(reason, NO_FILES_REASON),
        other => panic!("Expected NoFormatMatched, got {:?}", other.map(|r| r.format)),
    }
}

#[test]
fn test_broken_file_is_recorded() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("main.tf"), "resource \"aws_vpc\" \"main\" {}\n").unwrap();
    fs::write(dir.path().join("broken.tf"), "resource \"aws_subnet\" {{{\n").unwrap();

    let result = create_analyzer().analyze(dir.path()).unwrap();
    assert_eq!(result.graph.resources.len(), 1);
    assert_eq!(result.parse_errors.len(), 1);
}

// ============================================================================
// CLI Tests
// ============================================================================

#[test]
fn test_cli_version() {
    infragraph()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("infragraph "));
}

#[test]
fn test_cli_analyze_writes_markdown() {
    let out = TempDir::new().unwrap();
    infragraph()
        .arg("analyze")
        .arg(fixtures_path("terraform_network"))
        .arg("--output")
        .arg(out.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Analysis complete"));

    let md = fs::read_to_string(out.path().join(MARKDOWN_FILE)).unwrap();
    assert!(md.starts_with(COMMENT_MARKER));
    assert!(md.contains("```mermaid"));
    assert!(md.contains("subgraph net_aws_vpc_main"));
    assert!(out.path().join(MERMAID_FILE).exists());

    let network = fs::read_to_string(out.path().join(NETWORK_FILE)).unwrap();
    assert!(network.contains("subgraph sub_aws_subnet_app[\"aws_subnet.app\"]"));
    assert!(network.contains("tf_aws_instance_web[\"aws_instance.web\"]"));
}

#[test]
fn test_cli_analyze_json() {
    let out = TempDir::new().unwrap();
    infragraph()
        .arg("analyze")
        .arg(fixtures_path("cloudformation"))
        .args(["--format", "json", "--output"])
        .arg(out.path())
        .assert()
        .success();

    let text = fs::read_to_string(out.path().join("architecture.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["format"], "cloudformation");
    assert_eq!(value["used_fallback"], false);
}

#[test]
fn test_cli_empty_directory_writes_fallback() {
    let project = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    infragraph()
        .arg("analyze")
        .arg(project.path())
        .arg("--output")
        .arg(out.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No diagram generated"));

    let md = fs::read_to_string(out.path().join(MARKDOWN_FILE)).unwrap();
    assert!(md.contains("Reason: No IaC files found"));
    assert!(md.contains("- (none)"));
}

#[test]
fn test_cli_rejects_bad_direction() {
    infragraph()
        .arg("analyze")
        .arg(fixtures_path("terraform_network"))
        .args(["--direction", "sideways"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("direction"));
}
