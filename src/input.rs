use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;

/// Inline lists stay small so a typo'd flag can't fan out into a hundred
/// requests; larger universes come from a watchlist file.
pub const MAX_INLINE_SYMBOLS: usize = 5;

/// Parses a comma-separated inline list, e.g. `AAPL,MSFT,NVDA`.
pub fn parse_inline_symbols(raw: &str) -> Result<Vec<String>> {
    let symbols = normalize_symbols(raw.split(','));
    if symbols.is_empty() {
        anyhow::bail!("No valid symbols in {:?}", raw);
    }
    if symbols.len() > MAX_INLINE_SYMBOLS {
        anyhow::bail!(
            "{} symbols given inline, maximum is {}; put larger lists in a file",
            symbols.len(),
            MAX_INLINE_SYMBOLS
        );
    }
    Ok(symbols)
}

/// Loads symbols from a watchlist file: one or more per line, commas
/// allowed, `#` starts a comment.
pub fn load_symbol_file(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read symbol file {}", path.display()))?;
    let symbols = normalize_symbols(
        contents
            .lines()
            .map(|line| line.split('#').next().unwrap_or(""))
            .flat_map(|line| line.split(',')),
    );
    if symbols.is_empty() {
        anyhow::bail!("No valid symbols in {}", path.display());
    }
    Ok(symbols)
}

/// Uppercases, drops anything that does not look like a ticker, and dedupes
/// while preserving first-seen order.
fn normalize_symbols<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut symbols = Vec::new();
    for token in raw {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let upper = token.to_uppercase();
        if !valid_ticker(&upper) {
            tracing::warn!("⚠️ Skipping invalid symbol {:?}", token);
            continue;
        }
        if seen.insert(upper.clone()) {
            symbols.push(upper);
        }
    }
    symbols
}

// Covers dotted and dashed share classes like BRK.B and BF-B.
fn valid_ticker(symbol: &str) -> bool {
    !symbol.is_empty()
        && symbol.len() <= 10
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
}
