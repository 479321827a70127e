//! Cost oracle interface and the built-in analytic model
//!
//! The search loop never executes kernels itself; it asks a [`CostOracle`]
//! for the runtime of each distinct operator definition. Real deployments
//! implement the trait on top of a kernel library and a timer. The bundled
//! [`AnalyticOracle`] prices operators from their arithmetic intensity, which
//! keeps the whole pipeline deterministic and dependency-free.

use crate::attrs::OpAttrs;
use crate::error::CoreError;
use crate::kind::{ActiMode, OpKind};
use crate::tensor::TensorDims;

/// Measures operator runtimes.
///
/// `measure` is called once per distinct (kind, attrs, input shapes) key; the
/// model catalog memoizes results by interning definitions, so implementations
/// do not need their own cache to stay idempotent.
pub trait CostOracle {
    /// Runtime of one operator in milliseconds
    fn measure(
        &mut self,
        kind: OpKind,
        attrs: &OpAttrs,
        inputs: &[TensorDims],
        outputs: &[TensorDims],
    ) -> Result<f64, CoreError>;
}

/// Deterministic cost model based on arithmetic intensity.
///
/// Compute-bound kinds are priced at a nominal throughput; element-wise kinds
/// at a per-element cost; view-like kinds (`NoOp`, `Split`) are free. Every
/// materialized kernel additionally pays a fixed launch overhead, which is
/// what makes merge rewrites profitable: the merged kernel does the same
/// arithmetic but launches once.
#[derive(Debug, Clone)]
pub struct AnalyticOracle {
    /// Per-kernel launch overhead in milliseconds
    pub overhead_ms: f64,
}

/// Milliseconds per floating-point operation at the nominal 1 TFLOP/s
const MS_PER_FLOP: f64 = 1.0e-9;

impl Default for AnalyticOracle {
    fn default() -> Self {
        Self { overhead_ms: 0.02 }
    }
}

impl AnalyticOracle {
    pub fn new(overhead_ms: f64) -> Self {
        Self { overhead_ms }
    }
}

impl CostOracle for AnalyticOracle {
    fn measure(
        &mut self,
        kind: OpKind,
        attrs: &OpAttrs,
        inputs: &[TensorDims],
        outputs: &[TensorDims],
    ) -> Result<f64, CoreError> {
        let flops: f64 = match (kind, attrs) {
            // Views: no data touched, no kernel launched
            (OpKind::NoOp, _) | (OpKind::Split, _) => return Ok(0.0),

            (OpKind::Conv2d | OpKind::ConvBatch | OpKind::ConvRelu, OpAttrs::Conv2d(a)) => {
                let out = outputs[0].volume() as f64;
                let macs = out * (a.kernel.0 * a.kernel.1 * inputs[0].channels()) as f64;
                2.0 * macs + fused_acti_flops(a.acti, out)
            }

            (OpKind::Matmul | OpKind::MatmulActi, OpAttrs::Matmul(a)) => {
                let out = outputs[0].volume() as f64;
                let macs = out * inputs[0].channels() as f64;
                2.0 * macs + fused_acti_flops(a.acti, out)
            }

            (OpKind::Pool2dMax | OpKind::Pool2dAvg, OpAttrs::Pool2d(a)) => {
                outputs[0].volume() as f64 * (a.kernel.0 * a.kernel.1) as f64
            }

            // Scale, shift, and the two running-moment reads per element
            (OpKind::BatchNorm, _) => inputs[0].volume() as f64 * 4.0,

            (OpKind::Activation, _) => inputs[0].volume() as f64 * 4.0,

            (OpKind::ElementAdd, _) => outputs[0].volume() as f64,

            (OpKind::Concat, _) => outputs[0].volume() as f64,

            _ => return Err(CoreError::AttrKindMismatch { kind }),
        };
        Ok(self.overhead_ms + flops * MS_PER_FLOP)
    }
}

/// Extra work for an activation fused into a compute kernel. Cheaper than a
/// standalone activation pass because the value is already in registers.
fn fused_acti_flops(acti: ActiMode, elements: f64) -> f64 {
    match acti {
        ActiMode::None => 0.0,
        _ => elements,
    }
}
