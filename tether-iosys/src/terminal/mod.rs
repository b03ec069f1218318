pub mod crossterm;
