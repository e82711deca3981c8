//! TSV 행 디코더
//!
//! 파일 내용을 탭 구분 레코드로 나누고([`decode_rows`]), 레코드 하나를
//! 검증된 [`Message`]로 변환합니다([`decode_row`]).
//! 저장과 완료 기록은 [`FileIngestor`]가 담당합니다.
//!
//! # 열 순서
//! ```text
//! mqtt  n  unit_guid  msg_id  text  context  class  level  area  addr  block  type  bit  invert_bit
//! ```
//! 헤더 행은 없으며 `n` 열은 읽지만 저장하지 않습니다. 따옴표는 일반 CSV 규칙을 따릅니다.

mod ingestor;

pub use ingestor::{FileIngestor, IngestedFile};

use chrono::Utc;
use csv::StringRecord;
use uuid::Uuid;

use logdrop_core::types::Message;

/// 행이 가져야 하는 최소 필드 수
pub const EXPECTED_COLUMNS: usize = 14;

// 열 인덱스
const COL_MQTT: usize = 0;
const COL_UNIT_GUID: usize = 2;
const COL_MSG_ID: usize = 3;
const COL_TEXT: usize = 4;
const COL_CONTEXT: usize = 5;
const COL_CLASS: usize = 6;
const COL_LEVEL: usize = 7;
const COL_AREA: usize = 8;
const COL_ADDR: usize = 9;
const COL_BLOCK: usize = 10;
const COL_TYPE: usize = 11;
const COL_BIT: usize = 12;
const COL_INVERT_BIT: usize = 13;

/// 행 검증 실패
///
/// `Display` 출력이 그대로 파싱 실패 기록의 사유가 됩니다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowError {
    /// 필드 수 부족
    #[error("not enough columns, expected {expected} got {actual}")]
    ShortRow { expected: usize, actual: usize },

    /// 그룹 키가 UUID가 아님
    #[error("invalid unit_guid value: {0}")]
    InvalidUnitGuid(String),

    /// level이 정수가 아님
    #[error("invalid level value: {0}")]
    InvalidLevel(String),
}

/// 파일 전체를 탭 구분 레코드로 디코딩합니다.
///
/// 빈 행은 건너뜁니다. 잘못된 UTF-8 등 디코더 에러가 하나라도 있으면
/// 전체가 실패하며, 이 경우 어떤 행도 처리되지 않아야 합니다.
pub fn decode_rows(bytes: &[u8]) -> Result<Vec<StringRecord>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if is_blank(&record) {
            continue;
        }
        rows.push(record);
    }
    Ok(rows)
}

fn is_blank(record: &StringRecord) -> bool {
    record.len() == 1 && record.get(0).is_some_and(str::is_empty)
}

/// 레코드 하나를 검증하여 [`Message`]로 변환합니다.
///
/// 검사 순서: 필드 수 → `unit_guid` → `level`.
pub fn decode_row(record: &StringRecord) -> Result<Message, RowError> {
    if record.len() < EXPECTED_COLUMNS {
        return Err(RowError::ShortRow {
            expected: EXPECTED_COLUMNS,
            actual: record.len(),
        });
    }

    let field = |idx: usize| record.get(idx).unwrap_or_default();

    let unit_guid = Uuid::parse_str(field(COL_UNIT_GUID))
        .map_err(|e| RowError::InvalidUnitGuid(format!("{:?}: {e}", field(COL_UNIT_GUID))))?;

    let level = field(COL_LEVEL)
        .parse::<i64>()
        .map_err(|e| RowError::InvalidLevel(format!("{:?}: {e}", field(COL_LEVEL))))?;

    Ok(Message {
        id: Uuid::new_v4(),
        mqtt: field(COL_MQTT).to_owned(),
        unit_guid,
        msg_id: field(COL_MSG_ID).to_owned(),
        text: field(COL_TEXT).to_owned(),
        context: field(COL_CONTEXT).to_owned(),
        class: field(COL_CLASS).to_owned(),
        level,
        area: field(COL_AREA).to_owned(),
        addr: field(COL_ADDR).to_owned(),
        block: optional(field(COL_BLOCK)),
        kind: field(COL_TYPE).to_owned(),
        bit: optional(field(COL_BIT)),
        invert_bit: optional(field(COL_INVERT_BIT)),
        created_at: Utc::now(),
    })
}

/// 공백뿐이거나 비어 있으면 `None`, 아니면 원래 값을 그대로 보존
fn optional(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_owned())
    }
}

/// 레코드를 원본 행 형태(탭 구분)로 되돌립니다.
pub fn raw_line(record: &StringRecord) -> String {
    record.iter().collect::<Vec<_>>().join("\t")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const UNIT_A: &str = "6f1c2d3e-4a5b-4c6d-8e7f-901a2b3c4d5e";

    pub(crate) fn valid_line(unit: &str, msg_id: &str, level: &str) -> String {
        [
            "plant/line1",
            "1",
            unit,
            msg_id,
            "Motor overheat",
            "drive",
            "alarm",
            level,
            "A1",
            "DB10.DBX0.0",
            "",
            "bool",
            " 3 ",
            "  ",
        ]
        .join("\t")
    }

    fn single_row(line: &str) -> StringRecord {
        let rows = decode_rows(line.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        rows.into_iter().next().unwrap()
    }

    #[test]
    fn decodes_valid_row() {
        let row = single_row(&valid_line(UNIT_A, "M-1", "4"));
        let msg = decode_row(&row).unwrap();
        assert_eq!(msg.unit_guid.to_string(), UNIT_A);
        assert_eq!(msg.msg_id, "M-1");
        assert_eq!(msg.level, 4);
        assert_eq!(msg.kind, "bool");
        assert_eq!(msg.addr, "DB10.DBX0.0");
    }

    #[test]
    fn blank_optional_fields_become_none() {
        let row = single_row(&valid_line(UNIT_A, "M-1", "4"));
        let msg = decode_row(&row).unwrap();
        assert_eq!(msg.block, None);
        assert_eq!(msg.bit.as_deref(), Some(" 3 "));
        assert_eq!(msg.invert_bit, None);
    }

    #[test]
    fn optional_keeps_raw_value() {
        assert_eq!(optional(""), None);
        assert_eq!(optional(" \t "), None);
        assert_eq!(optional(" 7").as_deref(), Some(" 7"));
        assert_eq!(optional("x").as_deref(), Some("x"));
    }

    #[test]
    fn short_row_reports_counts() {
        let row = single_row("a\tb\tc");
        let err = decode_row(&row).unwrap_err();
        assert_eq!(err.to_string(), "not enough columns, expected 14 got 3");
    }

    #[test]
    fn invalid_unit_guid_is_rejected() {
        let row = single_row(&valid_line("not-a-uuid", "M-1", "4"));
        let err = decode_row(&row).unwrap_err();
        assert!(matches!(err, RowError::InvalidUnitGuid(_)));
        assert!(err.to_string().starts_with("invalid unit_guid value: \"not-a-uuid\""));
    }

    #[test]
    fn invalid_level_is_rejected() {
        let row = single_row(&valid_line(UNIT_A, "M-1", "high"));
        let err = decode_row(&row).unwrap_err();
        assert!(matches!(err, RowError::InvalidLevel(_)));
        assert!(err.to_string().starts_with("invalid level value: \"high\""));
    }

    #[test]
    fn unit_guid_checked_before_level() {
        let row = single_row(&valid_line("zzz", "M-1", "high"));
        assert!(matches!(
            decode_row(&row).unwrap_err(),
            RowError::InvalidUnitGuid(_)
        ));
    }

    #[test]
    fn extra_columns_are_ignored() {
        let line = format!("{}\textra\tmore", valid_line(UNIT_A, "M-9", "1"));
        let msg = decode_row(&single_row(&line)).unwrap();
        assert_eq!(msg.msg_id, "M-9");
    }

    #[test]
    fn blank_lines_are_skipped() {
        let content = format!(
            "{}\n\n{}\n",
            valid_line(UNIT_A, "M-1", "1"),
            valid_line(UNIT_A, "M-2", "2")
        );
        let rows = decode_rows(content.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn quoted_field_may_contain_tab() {
        let line = valid_line(UNIT_A, "M-1", "1").replace("Motor overheat", "\"Motor\toverheat\"");
        let msg = decode_row(&single_row(&line)).unwrap();
        assert_eq!(msg.text, "Motor\toverheat");
    }

    #[test]
    fn invalid_utf8_fails_whole_file() {
        let mut content = valid_line(UNIT_A, "M-1", "1").into_bytes();
        content.extend_from_slice(b"\n\xff\xfe\tbroken\n");
        assert!(decode_rows(&content).is_err());
    }

    #[test]
    fn raw_line_rejoins_with_tabs() {
        let row = single_row("a\tb\t\tc");
        assert_eq!(raw_line(&row), "a\tb\t\tc");
    }
}
