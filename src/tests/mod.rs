// Test modules for all components
pub mod test_activations;
pub mod test_network;
pub mod test_race;
pub mod test_track;
