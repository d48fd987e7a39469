// End-to-end tests for the Narrator API
//
// Each test gets its own server on an ephemeral port, its own workspace root
// in a temp directory and a fake synthesis service that renders WAV clips
// whose length follows the text length. Limits are lowered so that chunking
// and block merging are exercised with short texts.

mod helpers;
mod test_narration;
