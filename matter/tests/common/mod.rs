#![allow(dead_code)]

pub mod exchange;

pub fn init_logger() {
    let _ = env_logger::try_init();
}
