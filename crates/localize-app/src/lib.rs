// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod coordinator;
pub mod ids;
pub mod model;
pub mod segments;
pub mod session;
pub mod state;
pub mod store;
pub mod tabs;

pub use coordinator::*;
pub use ids::*;
pub use model::*;
pub use segments::*;
pub use session::*;
pub use state::*;
pub use store::*;
pub use tabs::*;
