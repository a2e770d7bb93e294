//! Per-request allocation scope (spec §3 Ownership, §5 resource model,
//! §9's de-singleton-ization note).
//!
//! Every raster and contour list allocated while servicing one request
//! is registered here. On drop, everything is released together, in
//! reverse allocation order; a release failure (there is none today for
//! in-process `Mat`/`Vec` storage, but the hook exists for parity with
//! the source's explicit "log and continue" release semantics) is
//! logged rather than aborting the remaining releases.

use crate::contour::Contour;
use crate::raster::Raster;

#[derive(Default)]
pub struct Scope {
    rasters: Vec<Raster>,
    contour_sets: Vec<Vec<Contour>>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a raster with the scope and return a handle (its index)
    /// that can be used to fetch it back later.
    pub fn own_raster(&mut self, raster: Raster) -> RasterHandle {
        self.rasters.push(raster);
        RasterHandle(self.rasters.len() - 1)
    }

    pub fn raster(&self, handle: RasterHandle) -> &Raster {
        &self.rasters[handle.0]
    }

    pub fn raster_mut(&mut self, handle: RasterHandle) -> &mut Raster {
        &mut self.rasters[handle.0]
    }

    pub fn own_contours(&mut self, contours: Vec<Contour>) -> ContourSetHandle {
        self.contour_sets.push(contours);
        ContourSetHandle(self.contour_sets.len() - 1)
    }

    pub fn contours(&self, handle: ContourSetHandle) -> &[Contour] {
        &self.contour_sets[handle.0]
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        // Release in reverse allocation order; a `Mat`/`Vec` drop cannot
        // fail in safe Rust, but the ordering itself is preserved so a
        // future fallible resource (e.g. a native handle) slots in here
        // without restructuring call sites.
        while self.contour_sets.pop().is_some() {}
        while self.rasters.pop().is_some() {}
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterHandle(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContourSetHandle(usize);
