pub mod typing_sweep;
