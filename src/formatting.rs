use std::fmt::Write as FmtWrite;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use cro_lib::output::CRO_OUTPUT_VERSION;
use cro_lib::{CroOutput, ErrorOutput, Level, VisionAnalysisError, VisionAnalysisResult};

use crate::cli::OutputFormat;

/// Write output in the requested format.
pub fn write_output(
    body: &CroOutput,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => write_json_output(body, output.as_deref())?,
        OutputFormat::Pretty => write_pretty_output(body, output.as_deref())?,
    };
    Ok(())
}

/// 0 when the page was readable, 1 when the model reported it unreadable.
pub fn exit_code_for_result(result: &VisionAnalysisResult) -> ExitCode {
    if result.is_unreadable() {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

/// Render an error and return the appropriate exit code.
pub fn render_error(
    err: VisionAnalysisError,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> ExitCode {
    log::debug!("command failed: {err:?}");
    let error_payload = err.to_payload();
    let payload = CroOutput::Error(ErrorOutput {
        version: CRO_OUTPUT_VERSION.to_string(),
        message: Some(error_payload.message.clone()),
        error: error_payload,
    });

    match format {
        OutputFormat::Json => {
            let content =
                serde_json::to_string(&payload).unwrap_or_else(|_| "{\"mode\":\"error\"}".into());
            if let Some(path) = output {
                if let Err(write_err) = std::fs::write(&path, &content) {
                    eprintln!("Failed to write error output: {}", write_err);
                    println!("{content}");
                }
            } else {
                println!("{content}");
            }
        }
        OutputFormat::Pretty => {
            if let Err(write_err) = write_pretty_output(&payload, output.as_deref()) {
                eprintln!("Failed to write error output: {}", write_err);
            }
        }
    };

    // Exit code 2 is reserved for errors; an unreadable page uses 1.
    ExitCode::from(2)
}

fn write_json_output(
    body: &CroOutput,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let content = serde_json::to_string(body)?;
    if let Some(path) = output {
        std::fs::write(path, content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

fn write_pretty_output(body: &CroOutput, output: Option<&Path>) -> io::Result<()> {
    let use_human = output.is_none() && std::io::stdout().is_terminal();

    if use_human {
        println!("{}", format_pretty(body, true));
        return Ok(());
    }

    // Non-tty or file output: keep JSON shape for pipelines/files.
    let content =
        serde_json::to_string_pretty(body).unwrap_or_else(|_| "{\"mode\":\"error\"}".to_string());
    if let Some(path) = output {
        std::fs::write(path, &content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

/// Format output for human consumption in a terminal.
pub fn format_pretty(body: &CroOutput, colorize: bool) -> String {
    match body {
        CroOutput::Analyze(out) => {
            let mut buf = String::new();
            let header = color("[ANALYZE]", "36", colorize);
            writeln!(
                buf,
                "{} Above-the-fold analysis ({}, {})",
                header, out.context, out.model
            )
            .ok();
            writeln!(buf, "Desktop: {}", out.desktop).ok();
            writeln!(buf, "Mobile:  {}", out.mobile).ok();
            write_result(&mut buf, &out.result, colorize);
            buf
        }
        CroOutput::Validate(out) => {
            let mut buf = String::new();
            let header = color("[VALIDATE]", "34", colorize);
            writeln!(buf, "{} Reply is valid: {}", header, out.input).ok();
            write_result(&mut buf, &out.result, colorize);
            buf
        }
        CroOutput::Error(out) => {
            let mut buf = String::new();
            let header = color("[ERROR]", "31", colorize);
            let message = out
                .message
                .as_deref()
                .unwrap_or(out.error.message.as_str());
            writeln!(buf, "{} {}", header, message).ok();
            if let Some(remediation) = &out.error.remediation {
                writeln!(buf, "Hint: {}", remediation).ok();
            }
            buf
        }
    }
}

fn write_result(buf: &mut String, result: &VisionAnalysisResult, colorize: bool) {
    let status = if result.is_unreadable() {
        color("UNREADABLE", "31", colorize)
    } else {
        color("OK", "32", colorize)
    };
    writeln!(
        buf,
        "Status: {} (confidence {})",
        status,
        level_colored(result.confidence(), false, colorize)
    )
    .ok();

    let hero = result.hero();
    if let Some(headline) = &hero.headline {
        writeln!(buf, "Headline: {headline}").ok();
    }
    if let Some(sub) = &hero.subheadline {
        writeln!(buf, "Subheadline: {sub}").ok();
    }
    if let Some(cta) = &hero.cta.text {
        writeln!(buf, "Hero CTA: {cta}").ok();
    }

    if !result.ctas().is_empty() {
        writeln!(buf, "CTAs:").ok();
        for cta in result.ctas() {
            let label = if cta.text.is_empty() {
                "(no label)"
            } else {
                cta.text.as_str()
            };
            writeln!(
                buf,
                "- {:24} {:8} {}",
                label,
                level_colored(cta.prominence, false, colorize),
                cta.location_hint
            )
            .ok();
        }
    }

    if !result.visual_hierarchy().is_empty() {
        writeln!(buf, "Visual hierarchy: {}", result.visual_hierarchy().join(" > ")).ok();
    }
    if !result.trust_signals().is_empty() {
        writeln!(buf, "Trust signals: {}", result.trust_signals().join(", ")).ok();
    }

    let responsiveness = result.responsiveness();
    writeln!(
        buf,
        "Mobile risk: {}",
        level_colored(responsiveness.overall_risk, true, colorize)
    )
    .ok();
    for issue in &responsiveness.issues {
        writeln!(buf, "- {issue}").ok();
    }

    let perf = result.performance_signals();
    if perf.heavy_media || perf.notes.is_some() {
        writeln!(
            buf,
            "Performance: heavy media {}{}",
            if perf.heavy_media { "yes" } else { "no" },
            perf.notes
                .as_deref()
                .map(|n| format!(" ({n})"))
                .unwrap_or_default()
        )
        .ok();
    }

    let differences = result.differences();
    if differences.flagged || !differences.notes.is_empty() {
        let flag = if differences.flagged {
            color("flagged", "33", colorize)
        } else {
            "not flagged".to_string()
        };
        writeln!(buf, "Desktop vs mobile: {flag}").ok();
        for note in &differences.notes {
            writeln!(buf, "- {note}").ok();
        }
    }

    match result.cost() {
        Some(cost) => writeln!(
            buf,
            "Estimated cost: ${:.4} ({} in / {} out tokens)",
            cost.estimated_usd, cost.input_tokens, cost.output_tokens
        )
        .ok(),
        None => writeln!(buf, "Estimated cost: unknown").ok(),
    };
}

/// Color a level; `risk` flips the palette so that high is red.
fn level_colored(level: Level, risk: bool, colorize: bool) -> String {
    let code = match (level, risk) {
        (Level::High, false) | (Level::Low, true) => "32",
        (Level::Medium, _) => "33",
        (Level::Low, false) | (Level::High, true) => "31",
    };
    color(level.as_str(), code, colorize)
}

/// Apply ANSI color codes when enabled.
fn color(text: &str, code: &str, colorize: bool) -> String {
    if colorize {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cro_lib::{parse_and_validate, ErrorCategory, ErrorPayload, ValidateOutput};

    fn result() -> VisionAnalysisResult {
        parse_and_validate(
            r#"{
                "status": "ok",
                "hero": { "headline": "Launch faster", "subheadline": null,
                          "cta": { "text": "Try it", "styleClues": [] }, "supportingElements": [] },
                "ctas": [{ "text": null, "prominence": "medium" }],
                "trustSignals": ["4.8 stars"],
                "visualHierarchy": ["headline", "cta"],
                "responsiveness": { "issues": ["nav overlaps logo"], "overallRisk": "high" },
                "performanceSignals": { "heavyMedia": false, "notes": null },
                "differences": { "notes": [], "flagged": true },
                "confidence": "low"
            }"#,
        )
        .expect("valid sample")
    }

    #[test]
    fn pretty_validate_output_lists_key_findings() {
        let body = CroOutput::Validate(ValidateOutput {
            version: CRO_OUTPUT_VERSION.to_string(),
            input: "reply.json".into(),
            result: result(),
        });
        let text = format_pretty(&body, false);

        assert!(text.contains("[VALIDATE] Reply is valid: reply.json"));
        assert!(text.contains("Status: OK (confidence low)"));
        assert!(text.contains("Headline: Launch faster"));
        assert!(text.contains("(no label)"));
        assert!(text.contains("unspecified"));
        assert!(text.contains("Visual hierarchy: headline > cta"));
        assert!(text.contains("Mobile risk: high"));
        assert!(text.contains("Desktop vs mobile: flagged"));
        assert!(text.contains("Estimated cost: unknown"));
    }

    #[test]
    fn pretty_error_includes_hint() {
        let body = CroOutput::Error(ErrorOutput {
            version: CRO_OUTPUT_VERSION.to_string(),
            message: None,
            error: ErrorPayload::new(ErrorCategory::Config, "no key".into(), "set the key"),
        });
        let text = format_pretty(&body, false);
        assert!(text.contains("[ERROR] no key"));
        assert!(text.contains("Hint: set the key"));
    }

    #[test]
    fn colorized_levels_use_risk_palette() {
        assert_eq!(level_colored(Level::High, true, true), "\x1b[31mhigh\x1b[0m");
        assert_eq!(level_colored(Level::High, false, true), "\x1b[32mhigh\x1b[0m");
    }
}
