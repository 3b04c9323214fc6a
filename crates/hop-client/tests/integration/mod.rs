mod lifecycle;
mod relay;
