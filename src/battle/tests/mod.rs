pub mod common;









#[cfg(test)]
mod test_random_walks;
