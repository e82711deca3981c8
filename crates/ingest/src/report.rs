//! 유닛 리포트 렌더러
//!
//! [`TextReportRenderer`]는 core의 [`ReportTrigger`]를 구현합니다.
//! 유닛의 모든 메시지를 최신순으로 읽어 고정폭 텍스트 표로 만들고
//! `<output_dir>/<unit>.txt`를 원자적으로 교체합니다 (임시 파일 + rename).

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::debug;
use uuid::Uuid;

use logdrop_core::error::ReportError;
use logdrop_core::pipeline::{RecordStore, ReportTrigger};
use logdrop_core::types::Message;

/// 셀 최대 폭 (문자)
const MAX_CELL_WIDTH: usize = 40;

/// 값이 없는 셀 표시
const ABSENT: &str = "-";

const HEADERS: [&str; 11] = [
    "MsgId", "Text", "Class", "Level", "Area", "Addr", "Block", "Type", "Bit", "InvertBit",
    "CreatedAt",
];

/// 텍스트 리포트 렌더러
pub struct TextReportRenderer<S> {
    output_dir: PathBuf,
    store: Arc<S>,
}

impl<S: RecordStore> TextReportRenderer<S> {
    pub fn new(output_dir: impl Into<PathBuf>, store: Arc<S>) -> Self {
        Self {
            output_dir: output_dir.into(),
            store,
        }
    }

    /// 유닛 리포트 파일 경로
    pub fn report_path(&self, unit: Uuid) -> PathBuf {
        self.output_dir.join(format!("{unit}.txt"))
    }

    async fn write_atomic(&self, target: &Path, body: &str) -> Result<(), ReportError> {
        let io_err = |path: &Path, e: std::io::Error| ReportError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        };

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| io_err(&self.output_dir, e))?;

        // 같은 유닛을 여러 워커가 동시에 쓸 수 있으므로 임시 파일 이름은 매번 다릅니다.
        let tmp = self
            .output_dir
            .join(format!(".{}.tmp", Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| io_err(&tmp, e))?;
        if let Err(e) = tokio::fs::rename(&tmp, target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_err(target, e));
        }
        Ok(())
    }
}

impl<S: RecordStore> ReportTrigger for TextReportRenderer<S> {
    async fn generate(&self, unit: Uuid) -> Result<(), ReportError> {
        let messages = self.store.messages_for_unit(unit).await?;
        if messages.is_empty() {
            return Err(ReportError::NoMessages {
                unit: unit.to_string(),
            });
        }

        let body = render_report(unit, &messages, Utc::now());
        let target = self.report_path(unit);
        self.write_atomic(&target, &body).await?;

        debug!(
            unit = %unit,
            messages = messages.len(),
            path = %target.display(),
            "unit report written"
        );
        Ok(())
    }
}

/// 유닛 리포트 본문을 만듭니다.
pub fn render_report(unit: Uuid, messages: &[Message], generated_at: DateTime<Utc>) -> String {
    let rows: Vec<[String; 11]> = messages.iter().map(row_cells).collect();

    let mut widths = HEADERS.map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let _ = writeln!(out, "Unit Report: {unit}");
    let _ = writeln!(
        out,
        "Generated: {}",
        generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    let _ = writeln!(out, "Messages: {}", messages.len());
    out.push('\n');

    push_row(&mut out, &HEADERS.map(str::to_owned), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(rule.join("-+-").as_str());
    out.push('\n');
    for row in &rows {
        push_row(&mut out, row, &widths);
    }
    out
}

fn row_cells(m: &Message) -> [String; 11] {
    let opt = |v: &Option<String>| v.as_deref().map_or_else(|| ABSENT.to_owned(), truncate);
    [
        truncate(&m.msg_id),
        truncate(&m.text),
        truncate(&m.class),
        m.level.to_string(),
        truncate(&m.area),
        truncate(&m.addr),
        opt(&m.block),
        truncate(&m.kind),
        opt(&m.bit),
        opt(&m.invert_bit),
        m.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
    ]
}

/// 탭/개행을 공백으로 바꾸고 `MAX_CELL_WIDTH`를 넘으면 자릅니다.
fn truncate(value: &str) -> String {
    let flat: String = value
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    if flat.chars().count() <= MAX_CELL_WIDTH {
        return flat;
    }
    let mut cut: String = flat.chars().take(MAX_CELL_WIDTH - 1).collect();
    cut.push('~');
    cut
}

fn push_row(out: &mut String, cells: &[String; 11], widths: &[usize; 11]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect();
    out.push_str(line.join(" | ").trim_end());
    out.push('\n');
}
