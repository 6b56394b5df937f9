pub mod input_loop;
