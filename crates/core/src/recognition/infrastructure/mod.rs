pub mod gemini_oracle;
