//! Cooperative driver over a `futures::Stream` of rows.
//!
//! Same pipeline as [`ExportSession::run`]; the difference is that pulling a
//! row is an `.await`, and the driver yields to the runtime every
//! `yield_interval_rows` rows so a long export does not starve other tasks
//! on the same executor thread.

use futures::{Stream, StreamExt};

use gridstream_cells::{Accessor, RowShape};
use gridstream_core::budget::WriteBudget;
use gridstream_core::cancel::CancellationToken;
use gridstream_io::sink::CellSink;

use crate::error::ExecError;
use crate::report::ExportOutcome;
use crate::session::{Ending, ExportSession};

impl<S: CellSink, B: WriteBudget> ExportSession<S, B> {
    pub async fn run_stream<R, St>(
        mut self,
        rows: St,
        cancel: &CancellationToken,
    ) -> Result<ExportOutcome, ExecError>
    where
        R: RowShape,
        St: Stream<Item = gridstream_io::Result<R>>,
    {
        let accessors = self.registry().resolve::<R>(self.schema());
        futures::pin_mut!(rows);
        match self.drive_stream(&accessors, rows, cancel).await {
            Ok(ending) => self.complete(ending),
            Err(err) => {
                self.abort_and_warn();
                Err(err)
            }
        }
    }

    async fn drive_stream<R, St>(
        &mut self,
        accessors: &[Accessor<R>],
        mut rows: St,
        cancel: &CancellationToken,
    ) -> Result<Ending, ExecError>
    where
        R: RowShape,
        St: Stream<Item = gridstream_io::Result<R>> + Unpin,
    {
        self.begin()?;
        let every = self.config().yield_interval_rows;
        let mut since_yield = 0u64;
        loop {
            if cancel.is_cancelled() {
                return Ok(Ending::Cancelled);
            }
            let Some(next) = rows.next().await else {
                return Ok(Ending::Exhausted);
            };
            let row = next.map_err(|e| self.source_error(e))?;
            self.write_logical_row(accessors, &row)?;
            if self.flush_due() {
                self.periodic_flush()?;
                if cancel.is_cancelled() {
                    return Ok(Ending::Cancelled);
                }
            }
            since_yield += 1;
            if every > 0 && since_yield >= every {
                since_yield = 0;
                tokio::task::yield_now().await;
            }
        }
    }
}
