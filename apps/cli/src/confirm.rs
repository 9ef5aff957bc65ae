//! Confirmation gate for mutating operations

use std::io::{self, BufRead, Write};

use keyshift_credential::{Operation, Scope};

/// Exact answer that confirms a mutating run
pub const CONFIRMATION: &str = "YES";

/// Ask the operator to confirm `operation` over `scope`
///
/// Returns `true` only when the line read is exactly `YES` (surrounding
/// whitespace ignored). End of input counts as a refusal.
pub fn confirm(
    operation: Operation,
    scope: &Scope,
    input: &mut impl BufRead,
    prompt: &mut impl Write,
) -> io::Result<bool> {
    write!(
        prompt,
        "About to run {operation} for {scope}. Type {CONFIRMATION} to continue: "
    )?;
    prompt.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim() == CONFIRMATION)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(line: &str) -> bool {
        let mut prompt = Vec::new();
        confirm(
            Operation::RotateAndPropagate,
            &Scope::All,
            &mut line.as_bytes(),
            &mut prompt,
        )
        .unwrap()
    }

    #[test]
    fn test_only_exact_yes_confirms() {
        assert!(answer("YES\n"));
        assert!(answer("  YES  \n"));
        assert!(!answer("yes\n"));
        assert!(!answer("Y\n"));
        assert!(!answer(""));
    }
}
