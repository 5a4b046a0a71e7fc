mod test_exchange;
