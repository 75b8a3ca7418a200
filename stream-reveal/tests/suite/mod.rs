// Integration test modules, compiled into the single `all` test binary.
mod fence_safety;
mod tokio_reveal;
