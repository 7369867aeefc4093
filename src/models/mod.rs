pub mod ptk;
