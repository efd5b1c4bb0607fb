mod test_cleanup_loop;
mod test_token_bucket;
