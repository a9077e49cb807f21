mod discovery;
mod support;
