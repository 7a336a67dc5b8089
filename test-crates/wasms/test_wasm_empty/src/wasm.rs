// nothing exported, not even an allocator
