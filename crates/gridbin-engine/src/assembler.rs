use gridbin_kernel::{Kernel, KernelSolidHandle};
use gridbin_ops::{
    build_base_grid, build_base_unit, build_cutout, build_wall, grid_area, overlapping_cutouts,
};
use gridbin_types::{
    BinParameters, Outline, BASE_TILE_SIZE, BIN_CORNER_RADIUS, BOTTOM_PLATE_THICKNESS,
};
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, CacheStats, ResultCache};
use crate::config::PipelineConfig;
use crate::mesh::ModelMesh;
use crate::types::EngineError;

/// Builds complete bins from outlines, reusing cached intermediate solids.
///
/// Handles returned by [`BinAssembler::build`] belong to the cache and stay
/// valid until the next build or [`BinAssembler::clear_cache`].
pub struct BinAssembler {
    cache: ResultCache,
    config: PipelineConfig,
}

fn check_params(params: &BinParameters) -> Result<(), EngineError> {
    let invalid = |reason: String| Err(EngineError::InvalidParameters { reason });
    if !params.total_height.is_finite() || !params.base_height.is_finite() {
        return invalid("heights must be finite".to_string());
    }
    if params.base_height <= 0.0 {
        return invalid(format!(
            "base height must be positive, got {}",
            params.base_height
        ));
    }
    if params.total_height <= params.base_height + BOTTOM_PLATE_THICKNESS {
        return invalid(format!(
            "total height {} leaves no wall above base {} and plate {}",
            params.total_height, params.base_height, BOTTOM_PLATE_THICKNESS
        ));
    }
    Ok(())
}

impl BinAssembler {
    pub fn new(cache: ResultCache, config: PipelineConfig) -> Self {
        Self { cache, config }
    }

    pub fn from_config(config: PipelineConfig) -> Self {
        Self::new(ResultCache::new(config.cache_capacity), config)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Release every cached solid.
    pub fn clear_cache(&mut self, kernel: &mut dyn Kernel) {
        let entries = self.cache.len();
        self.cache.clear(kernel);
        info!(entries, "result cache cleared");
    }

    /// Build the bin enclosing `outlines`. Returns `None` for an empty list.
    ///
    /// On failure no partial model is kept; cached stages that completed
    /// remain available to the next build.
    pub fn build(
        &mut self,
        kernel: &mut dyn Kernel,
        outlines: &[Outline],
        params: BinParameters,
    ) -> Result<Option<KernelSolidHandle>, EngineError> {
        if outlines.is_empty() {
            debug!("no outlines, nothing to build");
            return Ok(None);
        }
        check_params(&params)?;

        let result = self.assemble(kernel, outlines, &params);
        let released = self.cache.release_evicted(kernel);
        if released > 0 {
            debug!(released, "released evicted solids");
        }
        let stats = self.cache.stats();
        match &result {
            Ok(_) => info!(
                outlines = outlines.len(),
                hits = stats.hits,
                misses = stats.misses,
                cached = self.cache.len(),
                "bin built"
            ),
            Err(e) => warn!(error = %e, "bin build failed"),
        }
        result.map(Some)
    }

    fn assemble(
        &mut self,
        kernel: &mut dyn Kernel,
        outlines: &[Outline],
        params: &BinParameters,
    ) -> Result<KernelSolidHandle, EngineError> {
        let bin_key = CacheKey::bin(outlines, params);
        if let Some(bin) = self.cache.get(&bin_key) {
            debug!("bin served from cache");
            return Ok(bin);
        }

        let area = grid_area(outlines)?;
        let wall_height = params.wall_height();

        let unit_key = CacheKey::base_unit(params.base_height, BASE_TILE_SIZE, BIN_CORNER_RADIUS);
        let unit = match self.cache.get(&unit_key) {
            Some(unit) => unit,
            None => {
                let unit =
                    build_base_unit(kernel, params.base_height, BASE_TILE_SIZE, BIN_CORNER_RADIUS)?;
                self.cache.put(unit_key, unit.clone());
                unit
            }
        };

        let grid_key = CacheKey::base_grid(&area, params.base_height);
        let grid = match self.cache.get(&grid_key) {
            Some(grid) => grid,
            None => {
                let grid =
                    build_base_grid(kernel, &area, params.base_height, BASE_TILE_SIZE, &unit)?;
                self.cache.put(grid_key, grid.clone());
                grid
            }
        };

        for (i, j) in overlapping_cutouts(outlines, wall_height)? {
            warn!(
                first = %outlines[i].id,
                second = %outlines[j].id,
                "cutout footprints overlap, subtracting in list order"
            );
        }

        let center = area.center();
        let mut tools = Vec::with_capacity(outlines.len());
        for outline in outlines {
            let key = CacheKey::cutout(outline, center, wall_height);
            if let Some(tool) = self.cache.get(&key) {
                tools.push(tool);
                continue;
            }
            if let Some(tool) = build_cutout(kernel, outline, center, wall_height)? {
                self.cache.put(key, tool.clone());
                tools.push(tool);
            }
        }

        let wall = build_wall(kernel, &area, wall_height, &tools)?;
        let placed = kernel.translate_solid(&wall, [0.0, 0.0, params.wall_floor()]);
        kernel.release(&wall);
        let placed = placed?;

        let bin = kernel.boolean_union(&grid, &placed);
        kernel.release(&placed);
        let bin = bin?;

        self.cache.put(bin_key, bin.clone());
        Ok(bin)
    }

    /// Tessellate a built solid into preview buffers.
    pub fn mesh(
        &self,
        kernel: &dyn Kernel,
        solid: &KernelSolidHandle,
    ) -> Result<ModelMesh, EngineError> {
        let options = self.config.mesh.resolved(BIN_CORNER_RADIUS);
        let mesh = kernel.tessellate(solid, &options)?;
        let edges = kernel.extract_edges(solid, self.config.edge_tolerance)?;
        let model = ModelMesh::from_kernel(mesh, edges);
        debug!(triangles = model.triangle_count(), "mesh generated");
        Ok(model)
    }

    /// Serialize a built solid as STEP.
    pub fn export_step(
        &self,
        kernel: &dyn Kernel,
        solid: &KernelSolidHandle,
    ) -> Result<Vec<u8>, EngineError> {
        let bytes = kernel.export_step(solid)?;
        debug!(bytes = bytes.len(), "STEP exported");
        Ok(bytes)
    }
}
