use super::types::TestResults;
use crate::runner::state::{FailureKind, Outcome, ScenarioResult};
use anyhow::Result;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;
use std::path::{Path, PathBuf};

pub const JUNIT_FILE: &str = "junit.xml";

fn seconds(ms: u64) -> String {
    (ms as f64 / 1000.0).to_string()
}

/// Generate JUnit XML report string from TestResults
pub fn generate_junit_xml(results: &TestResults) -> Result<String> {
    let report = &results.report;
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let tests = report.run.to_string();
    let failures = report.failed.to_string();
    let errors = report.errored.to_string();
    let total_duration: u64 = report.results.iter().map(|r| r.duration_ms).sum();
    let suite_name = if report.info.suite.is_empty() {
        "default"
    } else {
        report.info.suite.as_str()
    };

    let mut suites_start = BytesStart::new("testsuites");
    suites_start.push_attribute(("name", "mediconsult-e2e"));
    suites_start.push_attribute(("tests", tests.as_str()));
    suites_start.push_attribute(("failures", failures.as_str()));
    suites_start.push_attribute(("errors", errors.as_str()));
    suites_start.push_attribute(("time", seconds(total_duration).as_str()));
    writer.write_event(Event::Start(suites_start))?;

    // One <testsuite> per run; scenarios share a browser session
    let mut suite_start = BytesStart::new("testsuite");
    suite_start.push_attribute(("name", suite_name));
    suite_start.push_attribute(("tests", tests.as_str()));
    suite_start.push_attribute(("failures", failures.as_str()));
    suite_start.push_attribute(("errors", errors.as_str()));
    suite_start.push_attribute(("skipped", "0"));
    suite_start.push_attribute(("id", report.info.run_id.as_str()));
    suite_start.push_attribute(("time", seconds(total_duration).as_str()));
    suite_start.push_attribute(("timestamp", results.generated_at.as_str()));
    writer.write_event(Event::Start(suite_start))?;

    for result in &report.results {
        write_test_case(&mut writer, suite_name, result)?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuite")))?;
    writer.write_event(Event::End(BytesEnd::new("testsuites")))?;

    let xml = String::from_utf8(writer.into_inner().into_inner())?;
    Ok(xml)
}

fn write_test_case<W: std::io::Write>(
    writer: &mut Writer<W>,
    suite_name: &str,
    result: &ScenarioResult,
) -> Result<()> {
    let mut case_start = BytesStart::new("testcase");
    case_start.push_attribute(("name", result.name.as_str()));
    case_start.push_attribute(("classname", suite_name));
    case_start.push_attribute(("time", seconds(result.duration_ms).as_str()));
    writer.write_event(Event::Start(case_start))?;

    let failure = match &result.outcome {
        Outcome::Passed => None,
        Outcome::Failed { kind, message } => {
            let kind = match kind {
                FailureKind::Timeout => "TimeoutError",
                FailureKind::Assertion => "AssertionError",
            };
            Some(("failure", kind, message))
        }
        Outcome::Errored { message } => Some(("error", "HarnessError", message)),
    };

    if let Some((tag, kind, message)) = failure {
        let mut start = BytesStart::new(tag);
        start.push_attribute(("message", message.as_str()));
        start.push_attribute(("type", kind));
        writer.write_event(Event::Start(start))?;
        writer.write_event(Event::Text(BytesText::new(message)))?;
        writer.write_event(Event::End(BytesEnd::new(tag)))?;
    }

    if let Some(path) = &result.screenshot_path {
        writer.write_event(Event::Start(BytesStart::new("system-out")))?;
        writer.write_event(Event::Text(BytesText::new(&format!(
            "[[ATTACHMENT|{}]]",
            path
        ))))?;
        writer.write_event(Event::End(BytesEnd::new("system-out")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("testcase")))?;
    Ok(())
}

/// Write `junit.xml` into the output directory
pub fn write_report(results: &TestResults, output_dir: &Path) -> Result<PathBuf> {
    let xml = generate_junit_xml(results)?;
    let path = output_dir.join(JUNIT_FILE);
    std::fs::write(&path, xml)?;
    Ok(path)
}
