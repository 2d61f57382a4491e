//! CSV implementation of [`LedgerStore`].
//!
//! Each ledger is one CSV file. Rows are validated here, at the store
//! boundary; a row that fails becomes a [`Diagnostic`] and is skipped.
//!
//! | Ledger | Required columns | Aliases |
//! |--------|------------------|---------|
//! | tools | `tool_id, name, status, official_url` | `id` for `tool_id` |
//! | keywords | `keyword` | `last_used_at` for `last_used_date` |
//! | costs | `month, total_usd` | |
//! | ad revenue | `date, adsense_revenue_usd, source, note` | |
//! | metrics | `date, pageviews, clicks` | `pv` for `pageviews` |

use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use pipeline::{
    AdRevenueRecord, CostRecord, Diagnostic, KeywordRecord, KeywordStatus, LedgerKind,
    LedgerStore, MetricsRecord, Parsed, PipelineError, ToolId, ToolRecord, ToolStatus,
    UsdAmount, YearMonth,
};

use crate::error::LedgerError;
use crate::table::{read_table, write_table, Column, Table, TableRow};

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

pub(crate) mod columns {
    use crate::table::Column;

    pub const TOOL_ID: Column = Column::required("tool_id").alias(&["id"]);
    pub const TOOL_NAME: Column = Column::required("name");
    pub const TOOL_CATEGORY: Column = Column::optional("category");
    pub const TOOL_STATUS: Column = Column::required("status");
    pub const TOOL_OFFICIAL_URL: Column = Column::required("official_url");
    pub const TOOL_AFFILIATE_URL: Column = Column::optional("affiliate_url");
    pub const TOOLS: &[Column] = &[
        TOOL_ID,
        TOOL_NAME,
        TOOL_CATEGORY,
        TOOL_STATUS,
        TOOL_OFFICIAL_URL,
        TOOL_AFFILIATE_URL,
    ];

    pub const KEYWORD: Column = Column::required("keyword");
    pub const KEYWORD_INTENT: Column = Column::optional("intent");
    pub const KEYWORD_STATUS: Column = Column::optional("status");
    pub const KEYWORD_PRIORITY: Column = Column::optional("priority");
    pub const KEYWORD_LAST_USED: Column =
        Column::optional("last_used_date").alias(&["last_used_at"]);
    pub const KEYWORDS: &[Column] = &[
        KEYWORD,
        KEYWORD_INTENT,
        KEYWORD_STATUS,
        KEYWORD_PRIORITY,
        KEYWORD_LAST_USED,
    ];

    pub const COST_MONTH: Column = Column::required("month");
    pub const COST_TOTAL: Column = Column::required("total_usd");
    pub const COSTS: &[Column] = &[COST_MONTH, COST_TOTAL];

    pub const AD_DATE: Column = Column::required("date");
    pub const AD_AMOUNT: Column = Column::required("adsense_revenue_usd");
    pub const AD_SOURCE: Column = Column::required("source");
    pub const AD_NOTE: Column = Column::required("note");
    pub const AD_REVENUE: &[Column] = &[AD_DATE, AD_AMOUNT, AD_SOURCE, AD_NOTE];

    pub const METRIC_DATE: Column = Column::required("date");
    pub const METRIC_PAGEVIEWS: Column = Column::required("pageviews").alias(&["pv"]);
    pub const METRIC_CLICKS: Column = Column::required("clicks");
    pub const METRICS: &[Column] = &[METRIC_DATE, METRIC_PAGEVIEWS, METRIC_CLICKS];
}

// ---------------------------------------------------------------------------
// Row parsing
// ---------------------------------------------------------------------------

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| format!("invalid {field}: '{value}'"))
}

fn parse_amount(field: &str, value: &str) -> Result<UsdAmount, String> {
    value
        .parse::<f64>()
        .ok()
        .and_then(UsdAmount::new)
        .ok_or_else(|| format!("{field} must be a non-negative number (got '{value}')"))
}

fn parse_count(field: &str, value: &str) -> Result<u64, String> {
    if value.is_empty() {
        return Ok(0);
    }
    value
        .parse::<u64>()
        .map_err(|_| format!("{field} must be a non-negative integer (got '{value}')"))
}

pub(crate) fn parse_tool(table: &Table, row: &TableRow) -> Result<ToolRecord, String> {
    use crate::store::columns::*;
    let id = ToolId::new(row.get(table.index(&TOOL_ID))).ok_or("tool_id is empty")?;
    let name = row.get(table.index(&TOOL_NAME));
    if name.is_empty() {
        return Err("name is empty".to_string());
    }
    let status_raw = row.get(table.index(&TOOL_STATUS));
    let status =
        ToolStatus::parse(status_raw).ok_or_else(|| format!("unknown status '{status_raw}'"))?;
    let official_url = row.get(table.index(&TOOL_OFFICIAL_URL));
    if official_url.is_empty() {
        return Err("official_url is empty".to_string());
    }
    let non_empty = |v: &str| (!v.is_empty()).then(|| v.to_string());
    Ok(ToolRecord {
        id,
        name: name.to_string(),
        category: non_empty(row.get(table.index(&TOOL_CATEGORY))),
        status,
        official_url: official_url.to_string(),
        affiliate_url: non_empty(row.get(table.index(&TOOL_AFFILIATE_URL))),
    })
}

fn parse_keyword(table: &Table, row: &TableRow) -> Result<KeywordRecord, String> {
    use crate::store::columns::*;
    let keyword = row.get(table.index(&KEYWORD));
    if keyword.is_empty() {
        return Err("keyword is empty".to_string());
    }
    let status_raw = row.get(table.index(&KEYWORD_STATUS));
    let status = KeywordStatus::parse(status_raw)
        .ok_or_else(|| format!("unknown status '{status_raw}'"))?;
    let priority_raw = row.get(table.index(&KEYWORD_PRIORITY));
    let priority = if priority_raw.is_empty() {
        0
    } else {
        priority_raw
            .parse::<i64>()
            .map_err(|_| format!("priority must be an integer (got '{priority_raw}')"))?
    };
    let last_used_raw = row.get(table.index(&KEYWORD_LAST_USED));
    // Timestamps written by older tooling keep only their date part.
    let last_used_date = match last_used_raw.get(..10) {
        _ if last_used_raw.is_empty() => None,
        Some(day) => Some(parse_date("last_used_date", day)?),
        None => return Err(format!("invalid last_used_date: '{last_used_raw}'")),
    };
    let intent = row.get(table.index(&KEYWORD_INTENT));
    Ok(KeywordRecord {
        keyword: keyword.to_string(),
        intent: (!intent.is_empty()).then(|| intent.to_string()),
        status,
        priority,
        last_used_date,
    })
}

fn parse_cost(table: &Table, row: &TableRow) -> Result<CostRecord, String> {
    use crate::store::columns::*;
    let month_raw = row.get(table.index(&COST_MONTH));
    let month = YearMonth::parse(month_raw).ok_or_else(|| format!("invalid month: '{month_raw}'"))?;
    let total_usd = parse_amount("total_usd", row.get(table.index(&COST_TOTAL)))?;
    Ok(CostRecord { month, total_usd })
}

pub(crate) fn parse_ad_revenue(table: &Table, row: &TableRow) -> Result<AdRevenueRecord, String> {
    use crate::store::columns::*;
    Ok(AdRevenueRecord {
        date: parse_date("date", row.get(table.index(&AD_DATE)))?,
        adsense_revenue_usd: parse_amount("adsense_revenue_usd", row.get(table.index(&AD_AMOUNT)))?,
        source: row.get(table.index(&AD_SOURCE)).to_string(),
        note: row.get(table.index(&AD_NOTE)).to_string(),
    })
}

pub(crate) fn parse_metrics(table: &Table, row: &TableRow) -> Result<MetricsRecord, String> {
    use crate::store::columns::*;
    Ok(MetricsRecord {
        date: parse_date("date", row.get(table.index(&METRIC_DATE)))?,
        pageviews: parse_count("pageviews", row.get(table.index(&METRIC_PAGEVIEWS)))?,
        clicks: parse_count("clicks", row.get(table.index(&METRIC_CLICKS)))?,
    })
}

/// Parses every row of `table`, collecting failures as diagnostics.
pub(crate) fn parse_rows<T>(
    table: &Table,
    ledger: LedgerKind,
    parse: impl Fn(&Table, &TableRow) -> Result<T, String>,
) -> Parsed<T> {
    let mut parsed = Parsed::default();
    for row in &table.rows {
        let result = match &row.unreadable {
            Some(reason) => Err(reason.clone()),
            None => parse(table, row),
        };
        match result {
            Ok(record) => parsed.rows.push(record),
            Err(message) => {
                warn!(%ledger, line = row.line, %message, "Skipping malformed row");
                parsed.diagnostics.push(Diagnostic {
                    ledger,
                    line: Some(row.line),
                    message,
                });
            }
        }
    }
    debug!(
        %ledger,
        rows = parsed.rows.len(),
        skipped = parsed.diagnostics.len(),
        "Ledger loaded"
    );
    parsed
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// File locations of the five ledgers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerPaths {
    pub tools: PathBuf,
    pub keywords: PathBuf,
    pub costs: PathBuf,
    pub ad_revenue: PathBuf,
    pub metrics: PathBuf,
}

impl LedgerPaths {
    /// The conventional `data/*.csv` layout under `root`.
    pub fn under(root: &Path) -> Self {
        let data = root.join("data");
        Self {
            tools: data.join("tools.csv"),
            keywords: data.join("keywords.csv"),
            costs: data.join("costs.csv"),
            ad_revenue: data.join("ad_revenue.csv"),
            metrics: data.join("analytics_metrics.csv"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CsvLedgerStore {
    paths: LedgerPaths,
}

impl CsvLedgerStore {
    pub fn new(paths: LedgerPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &LedgerPaths {
        &self.paths
    }

    /// Reads an optional ledger; a missing file is an empty table.
    fn read_optional(path: &Path, columns: &[Column]) -> Result<Option<Table>, LedgerError> {
        match read_table(path, columns) {
            Ok(table) => Ok(Some(table)),
            Err(LedgerError::NotFound { .. }) => {
                debug!(path = %path.display(), "Optional ledger absent");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

fn keyword_fields(record: &KeywordRecord) -> [(Column, String); 5] {
    use crate::store::columns::*;
    [
        (KEYWORD, record.keyword.clone()),
        (KEYWORD_INTENT, record.intent.clone().unwrap_or_default()),
        (KEYWORD_STATUS, record.status.as_str().to_string()),
        (KEYWORD_PRIORITY, record.priority.to_string()),
        (
            KEYWORD_LAST_USED,
            record
                .last_used_date
                .map(|d| d.to_string())
                .unwrap_or_default(),
        ),
    ]
}

impl LedgerStore for CsvLedgerStore {
    fn load_tools(&self) -> Result<Parsed<ToolRecord>, PipelineError> {
        let table = read_table(&self.paths.tools, columns::TOOLS)?;
        Ok(parse_rows(&table, LedgerKind::Tools, parse_tool))
    }

    fn load_keywords(&self) -> Result<Parsed<KeywordRecord>, PipelineError> {
        match Self::read_optional(&self.paths.keywords, columns::KEYWORDS)? {
            Some(table) => Ok(parse_rows(&table, LedgerKind::Keywords, parse_keyword)),
            None => Ok(Parsed::default()),
        }
    }

    /// Rewrites the keyword ledger. Rows that parsed on load are replaced, in
    /// order, by `rows`; rows that did not parse are kept verbatim in place;
    /// rows beyond the loaded ones are appended. Unknown columns survive.
    fn save_keywords(&self, rows: &[KeywordRecord]) -> Result<(), PipelineError> {
        let path = &self.paths.keywords;
        let existing = Self::read_optional(path, columns::KEYWORDS)?;
        let (mut headers, old_rows) = match existing {
            Some(table) => {
                let valid: Vec<bool> = table
                    .rows
                    .iter()
                    .map(|r| r.unreadable.is_none() && parse_keyword(&table, r).is_ok())
                    .collect();
                let raw: Vec<(bool, Vec<String>)> = valid
                    .into_iter()
                    .zip(table.rows.iter().map(|r| r.fields.clone()))
                    .collect();
                (table.headers, raw)
            }
            None => (Vec::new(), Vec::new()),
        };

        for column in columns::KEYWORDS {
            let present = std::iter::once(column.name)
                .chain(column.aliases.iter().copied())
                .any(|name| headers.iter().any(|h| h == name));
            if !present {
                headers.push(column.name.to_string());
            }
        }
        let layout = Table {
            path: path.clone(),
            headers: headers.clone(),
            rows: Vec::new(),
        };
        let width = headers.len();
        let fill = |mut fields: Vec<String>, record: &KeywordRecord| {
            if fields.len() < width {
                fields.resize(width, String::new());
            }
            for (column, value) in keyword_fields(record) {
                if let Some(i) = layout.index(&column) {
                    fields[i] = value;
                }
            }
            fields
        };

        let mut records = rows.iter();
        let mut out = Vec::with_capacity(old_rows.len() + rows.len());
        for (valid, fields) in old_rows {
            if !valid {
                if !fields.is_empty() {
                    out.push(fields);
                }
                continue;
            }
            match records.next() {
                Some(record) => out.push(fill(fields, record)),
                None => continue,
            }
        }
        out.extend(records.map(|record| fill(Vec::new(), record)));

        write_table(path, &headers, out)?;
        debug!(path = %path.display(), rows = rows.len(), "Keyword ledger saved");
        Ok(())
    }

    fn load_costs(&self) -> Result<Parsed<CostRecord>, PipelineError> {
        match Self::read_optional(&self.paths.costs, columns::COSTS)? {
            Some(table) => Ok(parse_rows(&table, LedgerKind::Costs, parse_cost)),
            None => Ok(Parsed::default()),
        }
    }

    fn load_ad_revenue(&self) -> Result<Parsed<AdRevenueRecord>, PipelineError> {
        match Self::read_optional(&self.paths.ad_revenue, columns::AD_REVENUE)? {
            Some(table) => Ok(parse_rows(&table, LedgerKind::AdRevenue, parse_ad_revenue)),
            None => Ok(Parsed::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn store_in(dir: &Path) -> CsvLedgerStore {
        CsvLedgerStore::new(LedgerPaths::under(dir))
    }

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::create_dir_all(dir.join("data")).unwrap();
        fs::write(dir.join("data").join(name), contents).unwrap();
    }

    #[test]
    fn tools_parse_with_alias_and_skip_bad_rows() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "tools.csv",
            "id,name,category,official_url,affiliate_url,status,last_posted_at\n\
             notion,Notion,notes,https://notion.so,https://aff.partner.io/n,approved,\n\
             canva,Canva,design,https://canva.com,,paused,\n\
             ,Nameless,design,https://x.dev,,pending,\n",
        );
        let parsed = store_in(dir.path()).load_tools().unwrap();
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].id.as_str(), "notion");
        assert_eq!(parsed.rows[0].status, ToolStatus::Approved);
        assert_eq!(parsed.diagnostics.len(), 2);
        assert_eq!(parsed.diagnostics[0].line, Some(3));
        assert!(parsed.diagnostics[0].message.contains("paused"));
    }

    #[test]
    fn missing_tool_ledger_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = store_in(dir.path()).load_tools().unwrap_err();
        assert!(matches!(err, PipelineError::Ledger { .. }));
    }

    #[test]
    fn optional_ledgers_load_empty_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        assert!(store.load_costs().unwrap().rows.is_empty());
        assert!(store.load_ad_revenue().unwrap().rows.is_empty());
        assert!(store.load_keywords().unwrap().rows.is_empty());
    }

    #[test]
    fn ad_revenue_rejects_negative_and_bad_dates() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "ad_revenue.csv",
            "date,adsense_revenue_usd,source,note\n\
             2024-05-01,0.42,adsense,\n\
             2024-05-02,-1,adsense,refund\n\
             05/03/2024,0.10,adsense,\n",
        );
        let parsed = store_in(dir.path()).load_ad_revenue().unwrap();
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.diagnostics.len(), 2);
        assert!(parsed.diagnostics[0].message.contains("non-negative"));
    }

    #[test]
    fn costs_sum_per_row() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "costs.csv", "month,total_usd\n2024-05,60\n2024-05,61.5\n");
        let parsed = store_in(dir.path()).load_costs().unwrap();
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[1].month, YearMonth::new(2024, 5).unwrap());
    }

    #[test]
    fn keyword_save_keeps_bad_rows_and_extra_columns() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "keywords.csv",
            "keyword,intent,priority,status,last_used_at,owner\n\
             notion setup guide,setup,1,new,,ana\n\
             broken row,,1,archived,,bo\n\
             canva pricing,,2,pending,2024-04-01T09:00:00+09:00,cy\n",
        );
        let store = store_in(dir.path());
        let mut rows = store.load_keywords().unwrap().rows;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].status, KeywordStatus::Pending);
        assert_eq!(
            rows[1].last_used_date,
            NaiveDate::from_ymd_opt(2024, 4, 1)
        );

        rows[0].status = KeywordStatus::Used;
        rows[0].last_used_date = NaiveDate::from_ymd_opt(2024, 5, 16);
        rows.push(KeywordRecord::pending("figma use cases", None, 3));
        store.save_keywords(&rows).unwrap();

        let text = fs::read_to_string(dir.path().join("data/keywords.csv")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "keyword,intent,priority,status,last_used_at,owner");
        assert_eq!(lines[1], "notion setup guide,setup,1,used,2024-05-16,ana");
        assert_eq!(lines[2], "broken row,,1,archived,,bo");
        assert_eq!(lines[3], "canva pricing,,2,pending,2024-04-01,cy");
        assert_eq!(lines[4], "figma use cases,,3,pending,,");

        let reloaded = store.load_keywords().unwrap();
        assert_eq!(reloaded.rows.len(), 3);
        assert_eq!(reloaded.diagnostics.len(), 1);
    }

    #[test]
    fn non_utf8_keyword_row_is_skipped_with_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("data")).unwrap();
        let mut bytes = b"keyword,intent,status,priority,last_used_date\na,,pending,1,\n".to_vec();
        bytes.extend_from_slice(b"bad \xff row,,pending,1,\n");
        bytes.extend_from_slice(b"c,,pending,1,\n");
        fs::write(dir.path().join("data/keywords.csv"), &bytes).unwrap();

        let store = store_in(dir.path());
        let parsed = store.load_keywords().unwrap();
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[1].keyword, "c");
        assert_eq!(parsed.diagnostics.len(), 1);
        assert_eq!(parsed.diagnostics[0].line, Some(3));
        assert!(parsed.diagnostics[0].message.contains("UTF-8"));

        store.save_keywords(&parsed.rows).unwrap();
        let text = fs::read_to_string(dir.path().join("data/keywords.csv")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].starts_with("bad "));
        assert_eq!(lines[3], "c,,pending,1,");
    }

    #[test]
    fn keyword_save_keeps_fields_beyond_the_header() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "keywords.csv",
            "keyword,intent,status,priority,last_used_date\n\
             notion setup guide,,pending,1,,trailing,note\n",
        );
        let store = store_in(dir.path());
        let mut rows = store.load_keywords().unwrap().rows;
        rows[0].status = KeywordStatus::Used;
        store.save_keywords(&rows).unwrap();

        let text = fs::read_to_string(dir.path().join("data/keywords.csv")).unwrap();
        assert_eq!(
            text.lines().nth(1),
            Some("notion setup guide,,used,1,,trailing,note")
        );
    }

    #[test]
    fn keyword_save_creates_missing_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        store
            .save_keywords(&[KeywordRecord::pending("notion for beginners", None, 3)])
            .unwrap();
        let text = fs::read_to_string(dir.path().join("data/keywords.csv")).unwrap();
        assert_eq!(
            text,
            "keyword,intent,status,priority,last_used_date\nnotion for beginners,,pending,3,\n"
        );
    }
}
