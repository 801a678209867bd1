pub mod identity;
pub mod swagger_main;
pub mod todo;
pub mod todo_page;

#[cfg(test)]
pub mod test_util;
