// Markdown summary documents

use crate::analysis::AnalysisResult;
use std::fmt::Write;

/// First line of every generated document, used to find and replace it
pub const COMMENT_MARKER: &str = "<!-- auto-arch-diagram -->";

const HEADING: &str = "## Architecture Diagram (Auto)";

/// Max parse errors listed before summarizing the rest
const MAX_LISTED_ERRORS: usize = 5;

/// Summary document for a successful run.
///
/// The dependency diagram (`mermaid`) and the containment diagram
/// (`network`) are embedded when given.
pub fn render_markdown(analysis: &AnalysisResult, mermaid: Option<&str>, network: Option<&str>) -> String {
    let stats = analysis.graph.stats();
    let mut md = String::new();

    let _ = writeln!(md, "{}\n", COMMENT_MARKER);
    let _ = writeln!(md, "{}\n", HEADING);
    let _ = writeln!(
        md,
        "Summary: Generated a dependency-oriented {} diagram from {} resources and {} connections.\n",
        analysis.format, stats.resources, stats.edges
    );

    if let Some(mermaid) = mermaid {
        let _ = writeln!(md, "```mermaid\n{}```\n", ensure_newline(mermaid));
    }

    let assumptions = if analysis.used_fallback {
        "No explicit references found; connections are heuristic to show grouping."
    } else {
        "Connections represent inferred references (including explicit dependencies and attribute references)."
    };
    let _ = writeln!(md, "Assumptions: {}\n", assumptions);

    if !analysis.hierarchy.is_empty() {
        let _ = writeln!(md, "### Networks\n");
        for (network, group) in &analysis.hierarchy {
            let _ = writeln!(md, "- `{}`", network);
            for (subnet, members) in &group.subnets {
                let _ = writeln!(md, "  - `{}` ({} resources)", subnet, members.len());
            }
            if !group.other.is_empty() {
                let _ = writeln!(md, "  - other: {} resources", group.other.len());
            }
        }
        md.push('\n');
        if let Some(network) = network {
            let _ = writeln!(md, "```mermaid\n{}```\n", ensure_newline(network));
        }
    }

    if !analysis.parse_errors.is_empty() {
        let _ = writeln!(md, "### Parse errors ({})\n", analysis.parse_errors.len());
        for (path, err) in analysis.parse_errors.iter().take(MAX_LISTED_ERRORS) {
            let _ = writeln!(md, "- `{}`: {}", path.display(), err);
        }
        if analysis.parse_errors.len() > MAX_LISTED_ERRORS {
            let _ = writeln!(
                md,
                "- ... and {} more",
                analysis.parse_errors.len() - MAX_LISTED_ERRORS
            );
        }
    }

    md.trim_end().to_string() + "\n"
}

/// Document written when no diagram could be produced
pub fn fallback_markdown(files: &[String], reason: &str) -> String {
    let listed = if files.is_empty() {
        "- (none)".to_string()
    } else {
        files
            .iter()
            .map(|f| format!("- {}", f))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "{}\n\n{}\n\nSummary: Unable to generate diagram automatically.\n\nReason: {}\n\nChanged IaC files:\n{}\n",
        COMMENT_MARKER, HEADING, reason, listed
    )
}

fn ensure_newline(text: &str) -> String {
    if text.ends_with('\n') {
        text.to_string()
    } else {
        format!("{}\n", text)
    }
}
