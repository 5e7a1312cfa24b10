mod common;
mod employers;
