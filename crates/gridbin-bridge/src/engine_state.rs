use gridbin_engine::{BinAssembler, CacheStats, EngineError, ModelMesh, PipelineConfig};
use gridbin_kernel::{Kernel, KernelError};
use gridbin_types::BinParameters;
use tracing::{debug, info};

use crate::messages::BuildRequest;

/// Creates the kernel on first use.
pub type KernelBootstrap<K> = Box<dyn FnMut() -> Result<K, KernelError>>;

/// The engine state wrapper for the bridge.
///
/// Owns the kernel once it is bootstrapped and the assembler with its result
/// cache. Everything here runs on one thread; callers serialize access.
pub struct EngineState<K> {
    kernel: Option<K>,
    bootstrap: KernelBootstrap<K>,
    assembler: BinAssembler,
}

impl<K: Kernel + 'static> EngineState<K> {
    pub fn new(
        config: PipelineConfig,
        bootstrap: impl FnMut() -> Result<K, KernelError> + 'static,
    ) -> Self {
        Self {
            kernel: None,
            bootstrap: Box::new(bootstrap),
            assembler: BinAssembler::from_config(config),
        }
    }

    /// Bootstrap the kernel if that has not happened yet. A failed attempt
    /// leaves the state uninitialized so the next call retries.
    pub fn initialize(&mut self) -> Result<(), BridgeError> {
        if self.kernel.is_some() {
            debug!("kernel already initialized");
            return Ok(());
        }
        let kernel = (self.bootstrap)().map_err(BridgeError::Bootstrap)?;
        self.kernel = Some(kernel);
        info!("kernel initialized");
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.kernel.is_some()
    }

    pub fn params(&self, request: &BuildRequest) -> BinParameters {
        let config = self.assembler.config();
        BinParameters::new(
            request.total_height.unwrap_or(config.default_total_height),
            request.base_height.unwrap_or(config.default_base_height),
        )
    }

    /// Build the bin and tessellate it. `None` when there are no outlines.
    pub fn generate_model(
        &mut self,
        request: &BuildRequest,
    ) -> Result<Option<ModelMesh>, BridgeError> {
        let params = self.params(request);
        let kernel = self.kernel.as_mut().ok_or(BridgeError::NotInitialized)?;
        match self.assembler.build(kernel, &request.outlines, params)? {
            Some(bin) => Ok(Some(self.assembler.mesh(&*kernel, &bin)?)),
            None => Ok(None),
        }
    }

    /// Build the bin and serialize it as STEP.
    pub fn export_step(&mut self, request: &BuildRequest) -> Result<Vec<u8>, BridgeError> {
        if request.outlines.is_empty() {
            return Err(BridgeError::EmptyOutlines);
        }
        let params = self.params(request);
        let kernel = self.kernel.as_mut().ok_or(BridgeError::NotInitialized)?;
        let bin = self
            .assembler
            .build(kernel, &request.outlines, params)?
            .ok_or(BridgeError::EmptyOutlines)?;
        Ok(self.assembler.export_step(&*kernel, &bin)?)
    }

    pub fn clear_cache(&mut self) {
        if let Some(kernel) = self.kernel.as_mut() {
            self.assembler.clear_cache(kernel);
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.assembler.cache_stats()
    }

    pub fn cache_entries(&self) -> usize {
        self.assembler.cache().len()
    }

    /// Live solids in the kernel, 0 before initialization.
    pub fn live_solids(&self) -> usize {
        self.kernel.as_ref().map_or(0, |k| k.live_solids())
    }
}

/// Errors from the bridge layer.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("engine not initialized")]
    NotInitialized,

    #[error("no outlines to export")]
    EmptyOutlines,

    #[error("kernel bootstrap failed: {0}")]
    Bootstrap(KernelError),

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridbin_kernel::MockKernel;
    use gridbin_types::{Outline, Point2};

    fn state() -> EngineState<MockKernel> {
        EngineState::new(PipelineConfig::default(), || Ok(MockKernel::new()))
    }

    #[test]
    fn test_requires_initialization() {
        let mut state = state();
        assert!(!state.is_ready());
        let request = BuildRequest::new(vec![Outline::rounded_rect(
            "r",
            Point2::new(0.0, 0.0),
            20.0,
            20.0,
            2.0,
        )]);
        assert!(matches!(
            state.generate_model(&request),
            Err(BridgeError::NotInitialized)
        ));
        state.initialize().unwrap();
        state.initialize().unwrap();
        assert!(state.is_ready());
        assert!(state.generate_model(&request).unwrap().is_some());
    }

    #[test]
    fn test_missing_heights_use_config_defaults() {
        let state = state();
        let params = state.params(&BuildRequest::new(Vec::new()));
        assert_eq!(params.total_height, gridbin_types::DEFAULT_TOTAL_HEIGHT);
        assert_eq!(params.base_height, gridbin_types::DEFAULT_BASE_HEIGHT);
        let params = state.params(&BuildRequest::new(Vec::new()).with_heights(30.0, 5.0));
        assert_eq!(params, BinParameters::new(30.0, 5.0));
    }

    #[test]
    fn test_failed_bootstrap_can_retry() {
        let mut attempts = 0;
        let mut state = EngineState::new(PipelineConfig::default(), move || {
            attempts += 1;
            if attempts == 1 {
                Err(KernelError::Other {
                    message: "not yet".into(),
                })
            } else {
                Ok(MockKernel::new())
            }
        });
        assert!(matches!(state.initialize(), Err(BridgeError::Bootstrap(_))));
        assert!(!state.is_ready());
        state.initialize().unwrap();
        assert!(state.is_ready());
    }
}
