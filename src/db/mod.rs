pub mod dbcurricula;
