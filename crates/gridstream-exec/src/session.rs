//! Export session: drive rows from a source through chunking, sheet layout
//! and memory budgeting into a sink.
//!
//! Behavior:
//! - Schema, configuration and column count are validated on construction,
//!   so a rejected session never touches the sink.
//! - Rows are pulled one at a time; cancellation is checked before every pull
//!   and after every periodic flush.
//! - The memory monitor is consulted before every physical row. A recycle
//!   happens between rows, never inside one.
//! - On every exit path (completion, cancellation, error) the open sheet is
//!   closed and the sink finalized before control returns.

use std::sync::Arc;
use std::time::Instant;

use gridstream_cells::{
    Accessor, AccessorRegistry, Chunker, FormattedCell, LayoutError, RowShape, SheetManager,
    SheetPhase, ValueFormatter,
};
use gridstream_core::budget::{Admission, WriteBudget};
use gridstream_core::cancel::CancellationToken;
use gridstream_core::config::ExportConfig;
use gridstream_core::id::{RowIndex, SheetIndex};
use gridstream_core::limits::FormatLimits;
use gridstream_core::schema::ColumnSchema;
use gridstream_io::sink::{CellSink, RowRole};
use gridstream_io::source::RowSource;
use gridstream_mem::{CostModel, MemoryMonitor};

use crate::error::ExecError;
use crate::metrics;
use crate::report::{ExportOutcome, ExportReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Ending {
    Exhausted,
    Cancelled,
}

pub struct ExportSession<S: CellSink, B: WriteBudget = MemoryMonitor> {
    cfg: ExportConfig,
    schema: ColumnSchema,
    header: Arc<[String]>,
    limits: FormatLimits,
    sink: S,
    budget: B,
    cost: CostModel,
    registry: Arc<AccessorRegistry>,
    formatter: ValueFormatter,
    chunker: Chunker,
    sheets: SheetManager,
    report: ExportReport,
    started: Option<Instant>,
}

impl<S: CellSink> ExportSession<S, MemoryMonitor> {
    /// Session with a [`MemoryMonitor`] built from the configured budget.
    pub fn new(cfg: ExportConfig, schema: ColumnSchema, sink: S) -> Result<Self, ExecError> {
        cfg.validate()?;
        let budget = MemoryMonitor::new(cfg.memory_budget_bytes, cfg.flush_threshold_ratio)?;
        Self::with_budget(cfg, schema, sink, budget)
    }
}

impl<S: CellSink, B: WriteBudget> ExportSession<S, B> {
    pub fn with_budget(
        cfg: ExportConfig,
        schema: ColumnSchema,
        sink: S,
        budget: B,
    ) -> Result<Self, ExecError> {
        cfg.validate()?;
        let limits = cfg.effective_limits(sink.limits());
        if let Some(max_columns) = limits.max_columns {
            if schema.len() > max_columns {
                return Err(ExecError::Schema(format!(
                    "{} columns exceed the format limit of {max_columns}",
                    schema.len()
                )));
            }
        }

        let chunker = Chunker::new(
            limits.max_cell_text_length,
            cfg.overflow_policy,
            cfg.overflow_marker.clone(),
        );
        let sheets = SheetManager::new(limits.max_rows_per_sheet, cfg.overflow_policy);
        let header: Arc<[String]> = schema.headers().map(str::to_owned).collect();

        Ok(Self {
            formatter: ValueFormatter::new(cfg.boolean_style),
            cfg,
            schema,
            header,
            limits,
            sink,
            budget,
            cost: CostModel::default(),
            registry: AccessorRegistry::shared(),
            chunker,
            sheets,
            report: ExportReport::default(),
            started: None,
        })
    }

    /// Resolve accessors through `registry` instead of the process-wide one.
    pub fn with_registry(mut self, registry: Arc<AccessorRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_cost_model(mut self, cost: CostModel) -> Self {
        self.cost = cost;
        self
    }

    pub fn config(&self) -> &ExportConfig {
        &self.cfg
    }

    pub fn schema(&self) -> &ColumnSchema {
        &self.schema
    }

    pub fn registry(&self) -> &Arc<AccessorRegistry> {
        &self.registry
    }

    /// Limits in force: the tighter of configuration and sink.
    pub fn limits(&self) -> FormatLimits {
        self.limits
    }

    /// Pull every row from `source` (until exhausted or cancelled) and
    /// write it. The sink is finalized before this returns, also on error.
    pub fn run<R, Src>(
        mut self,
        mut source: Src,
        cancel: &CancellationToken,
    ) -> Result<ExportOutcome, ExecError>
    where
        R: RowShape,
        Src: RowSource<R>,
    {
        let accessors = self.registry.resolve::<R>(&self.schema);
        match self.drive(&accessors, &mut source, cancel) {
            Ok(ending) => self.complete(ending),
            Err(err) => {
                self.abort_and_warn();
                Err(err)
            }
        }
    }

    fn drive<R, Src>(
        &mut self,
        accessors: &[Accessor<R>],
        source: &mut Src,
        cancel: &CancellationToken,
    ) -> Result<Ending, ExecError>
    where
        R: RowShape,
        Src: RowSource<R>,
    {
        self.begin()?;
        loop {
            if cancel.is_cancelled() {
                return Ok(Ending::Cancelled);
            }
            let next = source.next_row().map_err(|e| self.source_error(e))?;
            let Some(row) = next else {
                return Ok(Ending::Exhausted);
            };
            self.write_logical_row(accessors, &row)?;
            if self.flush_due() {
                self.periodic_flush()?;
                if cancel.is_cancelled() {
                    return Ok(Ending::Cancelled);
                }
            }
        }
    }

    pub(crate) fn begin(&mut self) -> Result<(), ExecError> {
        self.started = Some(Instant::now());
        #[cfg(feature = "tracing")]
        tracing::debug!(
            columns = self.schema.len(),
            max_cell_text_length = ?self.limits.max_cell_text_length,
            max_rows_per_sheet = ?self.limits.max_rows_per_sheet,
            policy = ?self.cfg.overflow_policy,
            "export session started"
        );
        self.sink
            .begin(&self.schema)
            .map_err(|e| self.sink_error(e))?;
        let first = self.sheets.start().map_err(|e| self.layout_error(e))?;
        self.open_sheet(first)
    }

    pub(crate) fn write_logical_row<R: RowShape>(
        &mut self,
        accessors: &[Accessor<R>],
        row: &R,
    ) -> Result<(), ExecError> {
        let formatted: Vec<FormattedCell> = accessors
            .iter()
            .zip(self.schema.columns())
            .map(|(accessor, column)| self.formatter.format(accessor.get(row), column.kind))
            .collect();
        let payload: usize = formatted.iter().map(FormattedCell::len).sum();
        let plan = self.chunker.plan(&formatted);
        let span = plan.row_span();

        let segments = self
            .sheets
            .place(span)
            .map_err(|e| self.layout_error(e))?;
        for segment in segments {
            if segment.opens_sheet {
                self.roll_over(segment.sheet_index)?;
            }
            for i in 0..segment.len {
                let offset = segment.chunk_offset + i;
                let role = if span == 1 {
                    RowRole::Data
                } else {
                    RowRole::Chunk { offset, span }
                };
                let cells = plan.physical_row(offset);
                self.write_physical(segment.first_row.offset(i), role, &cells)?;
                self.report.physical_rows += 1;
            }
        }

        self.report.truncated_cells += plan.truncated_cells();
        self.report.split_cells += plan.split_cells();
        self.report.record_row_payload(payload as u64);
        self.report.logical_rows += 1;
        Ok(())
    }

    pub(crate) fn flush_due(&self) -> bool {
        let every = self.cfg.flush_interval_rows;
        every > 0 && self.report.logical_rows % every == 0
    }

    pub(crate) fn periodic_flush(&mut self) -> Result<(), ExecError> {
        self.sink.flush().map_err(|e| self.sink_error(e))?;
        self.report.periodic_flushes += 1;
        metrics::emit_progress(&self.report, self.elapsed());
        #[cfg(feature = "tracing")]
        tracing::trace!(rows = self.report.logical_rows, "periodic flush");
        Ok(())
    }

    fn elapsed(&self) -> std::time::Duration {
        self.started.map(|t| t.elapsed()).unwrap_or_default()
    }

    fn roll_over(&mut self, next: SheetIndex) -> Result<(), ExecError> {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            from = self.report.sheets,
            to = next.get(),
            rows = self.report.logical_rows,
            "sheet rollover"
        );
        self.sink.close_sheet().map_err(|e| self.sink_error(e))?;
        self.open_sheet(next)
    }

    fn open_sheet(&mut self, sheet: SheetIndex) -> Result<(), ExecError> {
        self.sink
            .start_sheet(sheet)
            .map_err(|e| self.sink_error(e))?;
        self.report.sheets = sheet.get();
        let header = Arc::clone(&self.header);
        let cells: Vec<&str> = header.iter().map(String::as_str).collect();
        self.write_physical(RowIndex::HEADER, RowRole::Header, &cells)?;
        self.report.header_rows += 1;
        Ok(())
    }

    fn write_physical(
        &mut self,
        row: RowIndex,
        role: RowRole,
        cells: &[&str],
    ) -> Result<(), ExecError> {
        let cost = self.cost.row_cost(cells);
        if self.budget.check(cost) == Admission::Recycle {
            self.sink.recycle().map_err(|e| self.sink_error(e))?;
            self.budget.reset();
            self.report.recycles += 1;
            metrics::emit("recycle", &[("before_row", row.get())]);
        }
        self.sink
            .write_row(row, role, cells)
            .map_err(|e| self.sink_error(e))?;
        self.budget.record(cost);
        self.sheets
            .add_bytes(cells.iter().map(|c| c.len() as u64).sum());
        Ok(())
    }

    pub(crate) fn complete(mut self, ending: Ending) -> Result<ExportOutcome, ExecError> {
        let open = self.sheets.finish().map_err(|e| self.layout_error(e))?;
        let closed = match open {
            Some(_) => self.sink.close_sheet(),
            None => Ok(()),
        };
        let finished = self.sink.finish();
        closed
            .and(finished)
            .map_err(|e| self.sink_error(e))?;

        self.report.peak_estimated_bytes = self.budget.peak_bytes();
        self.report.bytes_written = self.sink.bytes_written();
        self.report.elapsed = self.elapsed();
        let report = self.report;
        match ending {
            Ending::Exhausted => {
                metrics::emit_report("completed", &report);
                Ok(ExportOutcome::Completed(report))
            }
            Ending::Cancelled => {
                #[cfg(feature = "tracing")]
                tracing::debug!(rows = report.logical_rows, "export cancelled");
                metrics::emit_report("cancelled", &report);
                Ok(ExportOutcome::Cancelled(report))
            }
        }
    }

    /// Best-effort finalization after a fatal error. Cleanup failures are
    /// returned instead of raised so the original error is what the caller
    /// sees.
    pub(crate) fn abort(&mut self) -> Vec<ExecError> {
        let mut failures = Vec::new();
        if self.sheets.phase() == SheetPhase::Open {
            if let Err(e) = self.sink.close_sheet() {
                failures.push(self.sink_error(e));
            }
        }
        if let Err(e) = self.sheets.finish() {
            failures.push(self.layout_error(e));
        }
        if let Err(e) = self.sink.finish() {
            failures.push(self.sink_error(e));
        }
        failures
    }

    /// [`abort`](Self::abort), reporting cleanup failures as warnings.
    pub(crate) fn abort_and_warn(&mut self) {
        let failures = self.abort();
        #[cfg(feature = "tracing")]
        for failure in &failures {
            tracing::warn!(error = %failure, "cleanup after a failed export also failed");
        }
        #[cfg(not(feature = "tracing"))]
        drop(failures);
    }

    pub(crate) fn source_error(&self, source: gridstream_io::Error) -> ExecError {
        ExecError::Source {
            progress: self.report.progress(),
            source,
        }
    }

    fn sink_error(&self, source: gridstream_io::Error) -> ExecError {
        ExecError::Sink {
            progress: self.report.progress(),
            source,
        }
    }

    fn layout_error(&self, source: LayoutError) -> ExecError {
        ExecError::Layout {
            progress: self.report.progress(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridstream_core::config::OverflowPolicy;
    use gridstream_core::schema::{Column, ColumnKind};
    use gridstream_io::sink::{RecordingSink, SinkEvent};
    use gridstream_io::source::IterSource;

    /// Records like [`RecordingSink`] but fails every close and finish.
    #[derive(Default)]
    struct BrokenCleanup(RecordingSink);

    fn cleanup_failure() -> gridstream_io::Error {
        gridstream_io::Error::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk gone",
        ))
    }

    impl CellSink for BrokenCleanup {
        fn limits(&self) -> FormatLimits {
            self.0.limits()
        }
        fn begin(&mut self, schema: &ColumnSchema) -> gridstream_io::Result<()> {
            self.0.begin(schema)
        }
        fn start_sheet(&mut self, sheet: SheetIndex) -> gridstream_io::Result<()> {
            self.0.start_sheet(sheet)
        }
        fn write_row(
            &mut self,
            row: RowIndex,
            role: RowRole,
            cells: &[&str],
        ) -> gridstream_io::Result<()> {
            self.0.write_row(row, role, cells)
        }
        fn close_sheet(&mut self) -> gridstream_io::Result<()> {
            Err(cleanup_failure())
        }
        fn recycle(&mut self) -> gridstream_io::Result<()> {
            self.0.recycle()
        }
        fn flush(&mut self) -> gridstream_io::Result<()> {
            self.0.flush()
        }
        fn finish(&mut self) -> gridstream_io::Result<()> {
            Err(cleanup_failure())
        }
    }

    struct Item {
        id: u32,
        body: String,
    }

    gridstream_cells::row_shape!(Item { id, body });

    fn schema() -> ColumnSchema {
        ColumnSchema::new(vec![
            Column::new("id", ColumnKind::Number),
            Column::new("body", ColumnKind::Text),
        ])
        .unwrap()
    }

    fn items(n: u32) -> Vec<Item> {
        (1..=n)
            .map(|id| Item {
                id,
                body: format!("row {id}"),
            })
            .collect()
    }

    fn config() -> ExportConfig {
        ExportConfig {
            memory_budget_bytes: 0,
            flush_interval_rows: 0,
            ..Default::default()
        }
    }

    #[test]
    fn header_then_rows() {
        let mut sink = RecordingSink::new();
        let outcome = ExportSession::new(config(), schema(), &mut sink)
            .unwrap()
            .with_registry(Arc::new(AccessorRegistry::new()))
            .run(IterSource::new(items(2).into_iter()), &CancellationToken::new())
            .unwrap();

        let report = outcome.report();
        assert_eq!(report.logical_rows, 2);
        assert_eq!(report.physical_rows, 2);
        assert_eq!(report.sheets, 1);

        let rows: Vec<_> = sink.rows().map(|r| r.cells.clone()).collect();
        assert_eq!(
            rows,
            vec![
                vec!["id".to_string(), "body".to_string()],
                vec!["1".to_string(), "row 1".to_string()],
                vec!["2".to_string(), "row 2".to_string()],
            ]
        );
        assert_eq!(sink.events().last(), Some(&SinkEvent::Finish));
    }

    #[test]
    fn too_many_columns_is_a_schema_error_without_output() {
        let cols = (0..300)
            .map(|i| Column::new(format!("c{i}"), ColumnKind::Text))
            .collect();
        let schema = ColumnSchema::new(cols).unwrap();
        let mut sink = RecordingSink::with_limits(FormatLimits::xml2003());
        let err = ExportSession::new(config(), schema, &mut sink)
            .err()
            .unwrap();
        assert!(matches!(err, ExecError::Schema(_)));
        assert!(sink.events().is_empty());
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let cfg = ExportConfig {
            flush_threshold_ratio: 0.0,
            ..config()
        };
        let err = ExportSession::new(cfg, schema(), RecordingSink::new())
            .err()
            .unwrap();
        assert!(matches!(err, ExecError::Config(_)));
        assert!(err.progress().is_none());
    }

    #[test]
    fn row_too_tall_is_fatal_under_chunk_and_output_is_finalized() {
        let cfg = ExportConfig {
            max_cell_text_length: Some(2),
            max_rows_per_sheet: Some(3),
            overflow_policy: OverflowPolicy::Chunk,
            ..config()
        };
        let rows = vec![Item {
            id: 1,
            body: "abcdefgh".into(),
        }];
        let mut sink = RecordingSink::new();
        let err = ExportSession::new(cfg, schema(), &mut sink)
            .unwrap()
            .run(IterSource::new(rows.into_iter()), &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(
            err,
            ExecError::Layout {
                source: LayoutError::RowTooTall { row_span: 4, .. },
                ..
            }
        ));
        assert!(sink.is_finished());
    }

    #[test]
    fn report_carries_payload_statistics_and_elapsed_time() {
        let rows = vec![
            Item { id: 1, body: "ab".into() },
            Item { id: 22, body: "abcdefgh".into() },
            Item { id: 3, body: String::new() },
        ];
        let outcome = ExportSession::new(config(), schema(), RecordingSink::new())
            .unwrap()
            .run(IterSource::new(rows.into_iter()), &CancellationToken::new())
            .unwrap();
        let report = outcome.report();
        // "1"+"ab", "22"+"abcdefgh", "3"+""
        assert_eq!(report.total_payload_bytes, 14);
        assert_eq!(report.max_row_payload_bytes, 10);
        assert_eq!(report.mean_row_payload_bytes, 4);
        assert!(report.elapsed > std::time::Duration::ZERO);
    }

    #[test]
    fn abort_returns_cleanup_failures() {
        let mut session =
            ExportSession::new(config(), schema(), BrokenCleanup::default()).unwrap();
        session.begin().unwrap();
        let failures = session.abort();
        assert_eq!(failures.len(), 2);
        assert!(failures
            .iter()
            .all(|f| matches!(f, ExecError::Sink { source: gridstream_io::Error::Io(_), .. })));
    }

    #[test]
    fn cleanup_failures_do_not_mask_the_original_error() {
        let sink = BrokenCleanup(RecordingSink::new().fail_after_rows(2));
        let err = ExportSession::new(config(), schema(), sink)
            .unwrap()
            .run(IterSource::new(items(5).into_iter()), &CancellationToken::new())
            .unwrap_err();
        match err {
            ExecError::Sink { progress, source } => {
                assert!(source.to_string().contains("injected write failure"));
                assert_eq!(progress.logical_rows, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn periodic_flushes_follow_the_interval() {
        let cfg = ExportConfig {
            flush_interval_rows: 2,
            ..config()
        };
        let mut sink = RecordingSink::new();
        let outcome = ExportSession::new(cfg, schema(), &mut sink)
            .unwrap()
            .run(IterSource::new(items(5).into_iter()), &CancellationToken::new())
            .unwrap();
        assert_eq!(outcome.report().periodic_flushes, 2);
        let flushes = sink
            .events()
            .iter()
            .filter(|e| matches!(e, SinkEvent::Flush))
            .count();
        assert_eq!(flushes, 2);
    }
}
