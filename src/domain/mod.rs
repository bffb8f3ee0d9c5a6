// Domain layer - scenes, batches and progress events

pub mod model;
