mod integration;
mod lifecycle;
mod ownership;
