mod common;

mod concurrency;
