
mod contention;
