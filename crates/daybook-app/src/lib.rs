// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod coerce;
pub mod grid;
pub mod ids;
pub mod model;
pub mod record;
pub mod state;

pub use coerce::*;
pub use grid::*;
pub use ids::*;
pub use model::*;
pub use record::*;
pub use state::*;
