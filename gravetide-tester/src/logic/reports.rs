use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use std::time::Duration;

use super::ScenarioResult;

pub fn write_console_report(
    out: &mut dyn Write,
    results: &[ScenarioResult],
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Soak Test Results Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "============================".cyan())?;

    let total = results.len();
    let passed = results.iter().filter(|r| r.passed).count();
    writeln!(out, "Total runs: {total}")?;
    writeln!(out, "Passed: {}", passed.to_string().green())?;
    writeln!(out, "Failed: {}", (total - passed).to_string().red())?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    for result in results {
        let status = if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };
        writeln!(out, "{status} {} (seed {})", result.scenario_name.bold(), result.seed)?;
        writeln!(
            out,
            "   Iterations: {}/{} clean",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(out, "   Average time: {:?}", result.average_duration)?;
        if let Some(last) = result.summaries.last() {
            writeln!(
                out,
                "   Last run: {} turns, player {}, {} actors, {} messages",
                last.turns_played,
                if last.player_alive { "alive" } else { "dead" },
                last.actors_left,
                last.messages
            )?;
            if last.raids_heard > 0 {
                writeln!(out, "   Raids heard: {}", last.raids_heard)?;
            }
            if !last.events_fired.is_empty() {
                let events: Vec<String> = last
                    .events_fired
                    .iter()
                    .map(|(event, count)| format!("{event}×{count}"))
                    .collect();
                writeln!(out, "   Events: {}", events.join(", "))?;
            }
            if let Some(background) = last.background {
                writeln!(
                    out,
                    "   Background: {} passes, {} district turns",
                    background.passes, background.district_turns
                )?;
            }
        }
        if !result.failures.is_empty() {
            writeln!(out, "   Failures:")?;
            for failure in &result.failures {
                writeln!(out, "     • {}", failure.red())?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn write_json_report(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, results)?;
    writeln!(out)?;
    Ok(())
}
