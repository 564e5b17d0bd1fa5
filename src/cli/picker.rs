//! Interactive fan model picker.
//!
//! Used when `fan curve` is run without a model number:
//! - list the stored models
//! - accept either a number (from the list) or a model number
//! - `q` cancels

use std::io::{self, BufRead, Write};

use crate::domain::FanModel;
use crate::error::AppError;

/// Prompt on stdin/stdout until a model is chosen.
pub fn prompt_for_model(models: &[FanModel]) -> Result<FanModel, AppError> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    pick_model(models, &mut stdin.lock(), &mut stdout.lock())
}

fn pick_model<R: BufRead, W: Write>(
    models: &[FanModel],
    input: &mut R,
    out: &mut W,
) -> Result<FanModel, AppError> {
    if models.is_empty() {
        return Err(AppError::new(
            2,
            "No fan models found. Add one with `fan model add`.",
        ));
    }

    let io_err = |e: io::Error| AppError::new(2, format!("Failed to use terminal: {e}"));

    writeln!(out, "Found {} fan model(s):", models.len()).map_err(io_err)?;
    for (idx, m) in models.iter().enumerate() {
        writeln!(out, "{:>3}) {}", idx + 1, m.model_number).map_err(io_err)?;
    }

    loop {
        write!(
            out,
            "Select a model by number (1-{}) or type a model number (q to quit): ",
            models.len()
        )
        .map_err(io_err)?;
        out.flush().map_err(io_err)?;

        let mut line = String::new();
        let bytes = input.read_line(&mut line).map_err(io_err)?;
        if bytes == 0 {
            return Err(AppError::new(
                2,
                "No input received. Pass the model number, e.g. `fan curve AXF-1440rpm-25°`.",
            ));
        }

        let choice = line.trim();
        if choice.eq_ignore_ascii_case("q") {
            return Err(AppError::new(2, "Canceled."));
        }

        if let Ok(n) = choice.parse::<usize>() {
            if (1..=models.len()).contains(&n) {
                return Ok(models[n - 1].clone());
            }
            writeln!(out, "Invalid choice: {n}. Enter a number between 1 and {}.", models.len())
                .map_err(io_err)?;
            continue;
        }

        match models.iter().find(|m| m.model_number == choice) {
            Some(m) => return Ok(m.clone()),
            None => writeln!(out, "Unknown model number: {choice}").map_err(io_err)?,
        }
    }
}
