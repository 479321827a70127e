//! Model catalog: operator interning and measurement
//!
//! The [`Model`] owns everything that outlives an individual graph: the cost
//! oracle, the guid counter, and the interning table that maps each distinct
//! (kind, attrs, input shapes) key to a single measured [`OpDef`]. Every graph
//! in a search shares definitions through this catalog, so each key is
//! measured exactly once no matter how many rewrites reference it.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use rewire_core::{
    infer_output_dims, CostOracle, Guid, Op, OpAttrs, OpDef, OpKind, TensorDims,
};

use crate::graph::GraphError;

#[derive(Clone, PartialEq, Eq, Hash)]
struct DefKey {
    kind: OpKind,
    attrs: OpAttrs,
    inputs: Vec<TensorDims>,
}

/// Process-wide operator catalog.
pub struct Model {
    oracle: Box<dyn CostOracle>,
    catalog: HashMap<DefKey, Arc<OpDef>>,
    next_guid: u64,
}

impl Model {
    /// Create a catalog backed by the given oracle
    pub fn new(oracle: Box<dyn CostOracle>) -> Self {
        Self {
            oracle,
            catalog: HashMap::new(),
            next_guid: 1,
        }
    }

    /// Return the canonical operator for this key, creating and measuring it
    /// on first use.
    ///
    /// The returned [`Op`] always carries a fresh guid; only the definition
    /// behind it is shared.
    pub fn get_or_create(
        &mut self,
        kind: OpKind,
        attrs: OpAttrs,
        inputs: Vec<TensorDims>,
    ) -> Result<Op, GraphError> {
        let outputs = infer_output_dims(kind, &attrs, &inputs)?;
        let key = DefKey {
            kind,
            attrs,
            inputs,
        };
        let def = match self.catalog.get(&key) {
            Some(def) => Arc::clone(def),
            None => {
                let runtime_ms =
                    self.oracle
                        .measure(kind, &key.attrs, &key.inputs, &outputs)?;
                debug!(%kind, runtime_ms, "measured operator");
                let def = Arc::new(OpDef {
                    kind,
                    attrs: key.attrs.clone(),
                    inputs: key.inputs.clone(),
                    outputs,
                    runtime_ms,
                });
                self.catalog.insert(key, Arc::clone(&def));
                def
            }
        };
        let guid = Guid::from_raw(self.next_guid);
        self.next_guid += 1;
        Ok(Op::new(guid, def))
    }

    /// Re-measure a definition without touching the interning table.
    ///
    /// Used by end-to-end graph execution, which reports wall-clock style
    /// numbers rather than the cached per-definition runtimes.
    pub fn measure_def(&mut self, def: &OpDef) -> Result<f64, GraphError> {
        Ok(self
            .oracle
            .measure(def.kind, &def.attrs, &def.inputs, &def.outputs)?)
    }

    /// Number of distinct operator definitions measured so far
    pub fn catalog_size(&self) -> usize {
        self.catalog.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewire_core::{ActiMode, AnalyticOracle, Conv2dAttrs, CoreError};

    fn model() -> Model {
        Model::new(Box::new(AnalyticOracle::default()))
    }

    fn conv_attrs() -> OpAttrs {
        OpAttrs::Conv2d(Conv2dAttrs {
            out_channels: 64,
            kernel: (3, 3),
            stride: (1, 1),
            padding: (1, 1),
            acti: ActiMode::None,
        })
    }

    #[test]
    fn test_interning_shares_definition() {
        let mut model = model();
        let input = TensorDims::d4(1, 32, 28, 28);
        let a = model
            .get_or_create(OpKind::Conv2d, conv_attrs(), vec![input])
            .unwrap();
        let b = model
            .get_or_create(OpKind::Conv2d, conv_attrs(), vec![input])
            .unwrap();

        assert_ne!(a, b, "instances have distinct guids");
        assert!(Arc::ptr_eq(&a.def_arc(), &b.def_arc()));
        assert_eq!(model.catalog_size(), 1);
    }

    #[test]
    fn test_distinct_keys_get_distinct_definitions() {
        let mut model = model();
        let a = model
            .get_or_create(
                OpKind::Conv2d,
                conv_attrs(),
                vec![TensorDims::d4(1, 32, 28, 28)],
            )
            .unwrap();
        let b = model
            .get_or_create(
                OpKind::Conv2d,
                conv_attrs(),
                vec![TensorDims::d4(1, 32, 56, 56)],
            )
            .unwrap();
        assert!(!Arc::ptr_eq(&a.def_arc(), &b.def_arc()));
        assert_eq!(model.catalog_size(), 2);
    }

    #[test]
    fn test_measurement_happens_once_per_key() {
        use std::cell::Cell;
        use std::rc::Rc;

        /// Oracle that counts calls
        struct CountingOracle {
            calls: Rc<Cell<usize>>,
        }
        impl CostOracle for CountingOracle {
            fn measure(
                &mut self,
                _kind: OpKind,
                _attrs: &OpAttrs,
                _inputs: &[TensorDims],
                _outputs: &[TensorDims],
            ) -> Result<f64, CoreError> {
                self.calls.set(self.calls.get() + 1);
                Ok(1.0)
            }
        }

        let calls = Rc::new(Cell::new(0));
        let mut model = Model::new(Box::new(CountingOracle {
            calls: Rc::clone(&calls),
        }));
        let input = TensorDims::d4(1, 32, 28, 28);
        for _ in 0..5 {
            model
                .get_or_create(OpKind::Conv2d, conv_attrs(), vec![input])
                .unwrap();
        }
        assert_eq!(calls.get(), 1);
        assert_eq!(model.catalog_size(), 1);
    }

    #[test]
    fn test_guids_are_monotonic() {
        let mut model = model();
        let input = TensorDims::d4(1, 32, 28, 28);
        let a = model
            .get_or_create(OpKind::Conv2d, conv_attrs(), vec![input])
            .unwrap();
        let b = model
            .get_or_create(OpKind::Conv2d, conv_attrs(), vec![input])
            .unwrap();
        assert!(a.guid() < b.guid());
    }

    #[test]
    fn test_shape_errors_propagate() {
        let mut model = model();
        let result = model.get_or_create(
            OpKind::Conv2d,
            conv_attrs(),
            vec![TensorDims::d3(4, 8, 32)],
        );
        assert!(result.is_err());
    }
}
