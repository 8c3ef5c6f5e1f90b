//! Table orchestration around the dispatch engine.
//!
//! Collects the unique foreign words of a table, resolves them through the
//! engine, and appends translated and word-info columns.

pub mod annotate;
pub mod io;
pub mod words;

use log::info;

pub use annotate::{extract_field, parse_word_info_columns, CellTranslations, WordInfoColumn};
pub use io::Table;
pub use words::{collect_unique, is_english, UniqueValues};

use crate::client::TranslationClient;
use crate::dispatch::{DispatchEngine, DispatchError};

/// Translate every foreign cell of `table` and return the annotated copy.
pub async fn translate_table<C: TranslationClient + 'static>(
    engine: &DispatchEngine<C>,
    table: &Table,
    columns: &[WordInfoColumn],
    output_lang: &str,
) -> Result<Table, DispatchError> {
    let unique = collect_unique(table.cells());
    info!(
        "Non-English unique cell values: {}, unique words: {}",
        unique.cells.len(),
        unique.words.len()
    );

    let words = engine.translate_all(&unique.words).await?;
    let translations =
        CellTranslations::build(&unique.cells, &words).map_err(DispatchError::InvalidConfig)?;

    Ok(table.annotate(&translations, columns, output_lang))
}
