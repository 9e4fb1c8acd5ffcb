//! Reading back delimiter-separated records

/// Split one record (without its line terminator) into cells, undoing
/// RFC 4180 quoting
pub fn parse_record(line: &str, delimiter: char) -> Result<Vec<String>, String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut chars = line.chars().peekable();
    let mut in_quotes = false;
    let mut was_quoted = false;

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    cell.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                cell.push(ch);
            }
            continue;
        }

        if ch == delimiter {
            cells.push(std::mem::take(&mut cell));
            was_quoted = false;
        } else if ch == '"' {
            if was_quoted || !cell.is_empty() {
                return Err(format!("unexpected quote in cell {}", cells.len() + 1));
            }
            in_quotes = true;
            was_quoted = true;
        } else {
            if was_quoted {
                return Err(format!("text after closing quote in cell {}", cells.len() + 1));
            }
            cell.push(ch);
        }
    }

    if in_quotes {
        return Err(format!("unterminated quoted cell {}", cells.len() + 1));
    }
    cells.push(cell);
    Ok(cells)
}

/// Split a list cell back into its items
pub fn split_list(cell: &str) -> Result<Vec<String>, String> {
    if cell.is_empty() {
        return Ok(Vec::new());
    }
    parse_record(cell, crate::formatter::quotes::LIST_SEPARATOR)
}
