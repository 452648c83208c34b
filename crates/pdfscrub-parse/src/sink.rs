//! Downstream consumers of an operator stream.

use pdfscrub_core::{Context, Result};

use crate::operator::Operator;

/// Receives operators in stream order.
///
/// Sinks may ignore any operator they have no use for. `finish` runs once
/// after the last operator of a stream.
pub trait ContentSink {
    fn process(&mut self, ctx: &mut Context, op: Operator) -> Result<()>;

    fn finish(&mut self, _ctx: &mut Context) -> Result<()> {
        Ok(())
    }
}

impl<S: ContentSink + ?Sized> ContentSink for &mut S {
    fn process(&mut self, ctx: &mut Context, op: Operator) -> Result<()> {
        (**self).process(ctx, op)
    }

    fn finish(&mut self, ctx: &mut Context) -> Result<()> {
        (**self).finish(ctx)
    }
}

/// Sink that keeps every operator it receives.
#[derive(Debug, Default, Clone)]
pub struct Recorder {
    ops: Vec<Operator>,
    finished: bool,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[Operator] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<Operator> {
        self.ops
    }

    /// Keywords of the recorded operators, in order.
    pub fn keywords(&self) -> Vec<&'static str> {
        self.ops.iter().map(Operator::keyword).collect()
    }

    /// Whether `finish` has been called.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl ContentSink for Recorder {
    fn process(&mut self, _ctx: &mut Context, op: Operator) -> Result<()> {
        self.ops.push(op);
        Ok(())
    }

    fn finish(&mut self, _ctx: &mut Context) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}
