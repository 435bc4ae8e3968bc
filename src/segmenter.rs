//! Splits a general-ledger export into per-account sub-ledgers.
//!
//! GL exports print each account as a code line, a header row whose first
//! cell is the marker text, the transaction rows, and a blank separator:
//!
//! ```text
//! 111000 Cash at bank
//! ลำดับที่ | Date | Voucher | ... | Debit | Credit
//! 1        | 02/01/2024 | ...
//! 2        | 05/01/2024 | ...
//! <blank>
//! ```
//!
//! [`LedgerSegmenter`] walks the rows once with a `{Seeking, InBlock}` state
//! machine and [`LedgerBook`] groups the resulting blocks by account code.

use crate::classifier::AccountCode;
use crate::schema::DEFAULT_MARKER_TEXT;
use crate::table::{Row, TabularSource};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const CODE_DELIMITERS: [char; 5] = ['-', ':', '/', '|', ','];

/// Decides which codes found above a marker row may open a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CodeFilter {
    LeadingChars(Vec<char>),
    Exact(Vec<AccountCode>),
    Any,
}

impl CodeFilter {
    /// Asset and liability codes only, the scope of the GL sub-sheet pass.
    pub fn balance_sheet_accounts() -> Self {
        CodeFilter::LeadingChars(vec!['1', '2'])
    }

    pub fn accepts(&self, code: &AccountCode) -> bool {
        match self {
            CodeFilter::LeadingChars(chars) => code
                .leading_char()
                .map(|c| chars.contains(&c))
                .unwrap_or(false),
            CodeFilter::Exact(codes) => codes.contains(code),
            CodeFilter::Any => !code.is_empty(),
        }
    }
}

impl Default for CodeFilter {
    fn default() -> Self {
        Self::balance_sheet_accounts()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerBlock {
    pub code: AccountCode,
    /// Index of the marker row in the source table.
    pub marker_row: usize,
    /// The marker row itself; GL exports use it as the column caption line.
    pub header: Row,
    pub entries: Vec<Row>,
}

impl LedgerBlock {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Segmentation {
    pub blocks: Vec<LedgerBlock>,
    /// Marker rows that did not open a block, for any reason.
    pub skipped_markers: Vec<usize>,
    /// Skipped marker rows with no account code above them at all.
    pub malformed_markers: Vec<usize>,
}

enum ScanState {
    Seeking,
    InBlock(LedgerBlock),
}

pub struct LedgerSegmenter {
    marker: String,
    code_column: usize,
    filter: CodeFilter,
}

impl LedgerSegmenter {
    pub fn new(marker: impl Into<String>, filter: CodeFilter) -> Self {
        Self {
            marker: marker.into(),
            code_column: 0,
            filter,
        }
    }

    pub fn with_code_column(mut self, column: usize) -> Self {
        self.code_column = column;
        self
    }

    pub fn is_marker(&self, row: &Row) -> bool {
        row.cell(self.code_column)
            .to_text()
            .map(|text| text.contains(self.marker.as_str()))
            .unwrap_or(false)
    }

    /// Code from a code line: the text before the first whitespace or delimiter.
    pub fn code_from_row(&self, row: &Row) -> Option<AccountCode> {
        let text = row.cell(self.code_column).to_text()?;
        let token = text
            .trim()
            .split(|c: char| c.is_whitespace() || CODE_DELIMITERS.contains(&c))
            .next()?;
        if token.is_empty() {
            return None;
        }
        Some(AccountCode::new(token))
    }

    fn code_above(&self, rows: &[Row], marker_index: usize) -> Option<AccountCode> {
        let above = rows.get(marker_index.checked_sub(1)?)?;
        if self.is_marker(above) {
            return None;
        }
        self.code_from_row(above)
    }

    fn open_block(&self, rows: &[Row], index: usize, outcome: &mut Segmentation) -> ScanState {
        match self.code_above(rows, index) {
            Some(code) if self.filter.accepts(&code) => ScanState::InBlock(LedgerBlock {
                code,
                marker_row: index,
                header: rows[index].clone(),
                entries: Vec::new(),
            }),
            Some(code) => {
                debug!("Marker at row {} is for account {}; out of scope", index, code);
                outcome.skipped_markers.push(index);
                ScanState::Seeking
            }
            None => {
                debug!("Marker at row {} has no account code above it; skipped", index);
                outcome.skipped_markers.push(index);
                outcome.malformed_markers.push(index);
                ScanState::Seeking
            }
        }
    }

    pub fn segment(&self, table: &TabularSource) -> Segmentation {
        let rows = table.rows();
        let mut outcome = Segmentation::default();
        let mut state = ScanState::Seeking;

        for (index, row) in rows.iter().enumerate() {
            state = match state {
                ScanState::Seeking => {
                    if self.is_marker(row) {
                        self.open_block(rows, index, &mut outcome)
                    } else {
                        ScanState::Seeking
                    }
                }
                ScanState::InBlock(mut block) => {
                    if row.is_blank() {
                        outcome.blocks.push(block);
                        ScanState::Seeking
                    } else if self.is_marker(row) {
                        // No blank separator: the row above this marker is the next
                        // block's code line, not an entry of the current block.
                        block.entries.pop();
                        outcome.blocks.push(block);
                        self.open_block(rows, index, &mut outcome)
                    } else {
                        block.entries.push(row.clone());
                        ScanState::InBlock(block)
                    }
                }
            };
        }

        if let ScanState::InBlock(block) = state {
            outcome.blocks.push(block);
        }

        info!(
            "Segmented '{}' into {} ledger blocks ({} markers skipped)",
            table.name,
            outcome.blocks.len(),
            outcome.skipped_markers.len()
        );

        outcome
    }
}

impl Default for LedgerSegmenter {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER_TEXT, CodeFilter::default())
    }
}

/// Entries collected for one account code across every block carrying it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerDestination {
    pub code: AccountCode,
    pub header: Row,
    pub entries: Vec<Row>,
    pub block_count: usize,
}

/// Destinations keyed by account code, iterated in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct LedgerBook {
    destinations: Vec<LedgerDestination>,
    index: HashMap<AccountCode, usize>,
}

impl LedgerBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_blocks(blocks: impl IntoIterator<Item = LedgerBlock>) -> Self {
        let mut book = Self::new();
        for block in blocks {
            book.absorb(block);
        }
        book
    }

    /// Appends the block's entries to the destination for its code, creating it if needed.
    pub fn absorb(&mut self, block: LedgerBlock) {
        match self.index.get(&block.code) {
            Some(&position) => {
                let destination = &mut self.destinations[position];
                destination.entries.extend(block.entries);
                destination.block_count += 1;
            }
            None => {
                self.index
                    .insert(block.code.clone(), self.destinations.len());
                self.destinations.push(LedgerDestination {
                    code: block.code,
                    header: block.header,
                    entries: block.entries,
                    block_count: 1,
                });
            }
        }
    }

    pub fn get(&self, code: &AccountCode) -> Option<&LedgerDestination> {
        self.index.get(code).map(|&position| &self.destinations[position])
    }

    pub fn destinations(&self) -> &[LedgerDestination] {
        &self.destinations
    }

    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_row(values: &[&str]) -> Row {
        Row::from_texts(values)
    }

    fn marker() -> Row {
        text_row(&[DEFAULT_MARKER_TEXT, "Date", "Voucher", "Debit", "Credit"])
    }

    fn entry(n: usize) -> Row {
        let seq = n.to_string();
        text_row(&[seq.as_str(), "02/01/2024", "JV-01", "100", ""])
    }

    fn blank() -> Row {
        text_row(&["", ""])
    }

    fn block_rows(code_line: &str, entries: usize) -> Vec<Row> {
        let mut rows = vec![text_row(&[code_line]), marker()];
        rows.extend((1..=entries).map(entry));
        rows
    }

    #[test]
    fn test_code_from_row_splits_on_first_delimiter() {
        let segmenter = LedgerSegmenter::default();
        let code = segmenter.code_from_row(&text_row(&["111000 Cash at bank"]));
        assert_eq!(code, Some(AccountCode::new("111000")));
        let code = segmenter.code_from_row(&text_row(&["211000-Payables"]));
        assert_eq!(code, Some(AccountCode::new("211000")));
        assert_eq!(segmenter.code_from_row(&text_row(&[""])), None);
    }

    #[test]
    fn test_two_blocks_separated_by_blank() {
        let mut rows = block_rows("411000 Sales", 6);
        rows.push(blank());
        rows.extend(block_rows("412000 Sales returns", 3));
        let table = TabularSource::new("gl", rows);

        let segmenter = LedgerSegmenter::new(DEFAULT_MARKER_TEXT, CodeFilter::Any);
        let outcome = segmenter.segment(&table);

        assert_eq!(outcome.blocks.len(), 2);
        assert_eq!(outcome.blocks[0].code.as_str(), "411000");
        assert_eq!(outcome.blocks[0].len(), 6);
        assert_eq!(outcome.blocks[1].code.as_str(), "412000");
        assert_eq!(outcome.blocks[1].len(), 3);
        assert_eq!(outcome.blocks[0].marker_row, 1);
        assert_eq!(outcome.blocks[1].marker_row, 10);
        assert!(outcome.skipped_markers.is_empty());
    }

    #[test]
    fn test_default_filter_rejects_non_balance_sheet_codes() {
        let mut rows = block_rows("999000", 2);
        rows.push(blank());
        rows.extend(block_rows("111000 Cash", 2));
        rows.push(blank());
        rows.extend(block_rows("411000 Sales", 2));
        let table = TabularSource::new("gl", rows);

        let outcome = LedgerSegmenter::default().segment(&table);
        assert_eq!(outcome.blocks.len(), 1);
        assert_eq!(outcome.blocks[0].code.as_str(), "111000");
        assert_eq!(outcome.skipped_markers, vec![1, 11]);
        assert!(outcome.malformed_markers.is_empty());
    }

    #[test]
    fn test_marker_without_preceding_row_is_skipped() {
        let mut rows = vec![marker(), entry(1)];
        rows.push(blank());
        let table = TabularSource::new("gl", rows);

        let outcome = LedgerSegmenter::default().segment(&table);
        assert!(outcome.blocks.is_empty());
        assert_eq!(outcome.skipped_markers, vec![0]);
        assert_eq!(outcome.malformed_markers, vec![0]);
    }

    #[test]
    fn test_marker_under_blank_code_line_is_malformed() {
        let mut rows = block_rows("111000 Cash", 1);
        rows.push(blank());
        rows.extend(block_rows("", 2));
        rows.push(blank());
        rows.extend(block_rows("411000 Sales", 1));
        let table = TabularSource::new("gl", rows);

        let outcome = LedgerSegmenter::default().segment(&table);
        assert_eq!(outcome.blocks.len(), 1);
        assert_eq!(outcome.skipped_markers, vec![5, 10]);
        assert_eq!(outcome.malformed_markers, vec![5]);
    }

    #[test]
    fn test_adjacent_blocks_are_not_merged() {
        // 111000 block runs straight into the 211000 code line with no blank row.
        let mut rows = block_rows("111000 Cash", 2);
        rows.extend(block_rows("211000 Payables", 1));
        let table = TabularSource::new("gl", rows);

        let outcome = LedgerSegmenter::default().segment(&table);
        assert_eq!(outcome.blocks.len(), 2);
        assert_eq!(outcome.blocks[0].len(), 2);
        assert_eq!(outcome.blocks[1].code.as_str(), "211000");
        assert_eq!(outcome.blocks[1].len(), 1);
    }

    #[test]
    fn test_code_line_directly_after_marker_yields_zero_length_block() {
        let rows = vec![
            text_row(&["111000 Cash"]),
            marker(),
            text_row(&["112000 Petty cash"]),
            marker(),
            entry(1),
        ];
        let table = TabularSource::new("gl", rows);

        let outcome = LedgerSegmenter::default().segment(&table);
        assert_eq!(outcome.blocks.len(), 2);
        assert!(outcome.blocks[0].is_empty());
        assert_eq!(outcome.blocks[1].code.as_str(), "112000");
        assert_eq!(outcome.blocks[1].len(), 1);
    }

    #[test]
    fn test_block_closed_by_end_of_table() {
        let table = TabularSource::new("gl", block_rows("111000", 4));
        let outcome = LedgerSegmenter::default().segment(&table);
        assert_eq!(outcome.blocks.len(), 1);
        assert_eq!(outcome.blocks[0].len(), 4);
    }

    #[test]
    fn test_exact_filter() {
        let mut rows = block_rows("411000", 1);
        rows.push(blank());
        rows.extend(block_rows("411100", 1));
        let table = TabularSource::new("gl", rows);

        let segmenter = LedgerSegmenter::new(
            DEFAULT_MARKER_TEXT,
            CodeFilter::Exact(vec![AccountCode::new("411100")]),
        );
        let outcome = segmenter.segment(&table);
        assert_eq!(outcome.blocks.len(), 1);
        assert_eq!(outcome.blocks[0].code.as_str(), "411100");
    }

    #[test]
    fn test_ledger_book_appends_same_code() {
        let mut rows = block_rows("111000", 2);
        rows.push(blank());
        rows.extend(block_rows("211000", 1));
        rows.push(blank());
        rows.extend(block_rows("111000", 3));
        let table = TabularSource::new("gl", rows);

        let outcome = LedgerSegmenter::default().segment(&table);
        assert_eq!(outcome.blocks.len(), 3);

        let book = LedgerBook::from_blocks(outcome.blocks);
        assert_eq!(book.len(), 2);
        let cash = book.get(&AccountCode::new("111000")).unwrap();
        assert_eq!(cash.entries.len(), 5);
        assert_eq!(cash.block_count, 2);
        assert_eq!(cash.entries[2], entry(1));
        assert_eq!(book.destinations()[1].code.as_str(), "211000");
    }
}
