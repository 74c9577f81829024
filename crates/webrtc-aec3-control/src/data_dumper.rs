//! Write-only sink for named numeric diagnostics.

/// Receives named traces from the pipeline. Values are never read back.
pub trait DataDumper: Send {
    fn dump(&mut self, name: &str, values: &[f32]);

    fn dump_bool(&mut self, name: &str, value: bool) {
        self.dump(name, &[if value { 1.0 } else { 0.0 }]);
    }

    /// Called once before the diagnostics of each block.
    fn begin_block(&mut self) {}
}

/// Discards all diagnostics.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDataDumper;

impl DataDumper for NullDataDumper {
    fn dump(&mut self, _name: &str, _values: &[f32]) {}
}

/// Emits diagnostics as `tracing` events at trace level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDataDumper {
    block: u64,
}

impl TracingDataDumper {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DataDumper for TracingDataDumper {
    fn dump(&mut self, name: &str, values: &[f32]) {
        tracing::trace!(target: "aec3_dump", block = self.block, name, ?values);
    }

    /// The block counter is attached to every event.
    fn begin_block(&mut self) {
        self.block = self.block.wrapping_add(1);
    }
}
