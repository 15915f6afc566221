//! Pure schema edits used by authoring tools.
//!
//! Every function borrows the schema and returns a new one; the argument is
//! never modified. Out-of-range indices leave the schema unchanged.

use crate::spec::{FormSchema, FormSchemaElement, FormSchemaPage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    fn neighbour(self, index: usize) -> isize {
        let index = index as isize;
        match self {
            Direction::Up => index - 1,
            Direction::Down => index + 1,
        }
    }
}

pub fn update_pages(
    schema: &FormSchema,
    update: impl FnOnce(Vec<FormSchemaPage>) -> Vec<FormSchemaPage>,
) -> FormSchema {
    FormSchema {
        pages: update(schema.pages.clone()),
        ..schema.clone()
    }
}

pub fn update_page(
    schema: &FormSchema,
    page_index: usize,
    update: impl FnOnce(FormSchemaPage) -> FormSchemaPage,
) -> FormSchema {
    update_pages(schema, |pages| replace_at(pages, page_index, update))
}

pub fn update_elements(
    schema: &FormSchema,
    page_index: usize,
    update: impl FnOnce(Vec<FormSchemaElement>) -> Vec<FormSchemaElement>,
) -> FormSchema {
    update_page(schema, page_index, |page| FormSchemaPage {
        elements: update(page.elements),
        ..page
    })
}

pub fn update_element(
    schema: &FormSchema,
    page_index: usize,
    element_index: usize,
    update: impl FnOnce(FormSchemaElement) -> FormSchemaElement,
) -> FormSchema {
    update_elements(schema, page_index, |elements| {
        replace_at(elements, element_index, update)
    })
}

/// Swaps two positions when both are within `[0, len)`; otherwise returns
/// the items unchanged. Moving the first item up or the last item down is a
/// no-op, not a wraparound.
pub fn safe_swap<T: Clone>(items: &[T], i: isize, j: isize) -> Vec<T> {
    let mut swapped = items.to_vec();
    if let (Some(i), Some(j)) = (in_bounds(items.len(), i), in_bounds(items.len(), j)) {
        swapped.swap(i, j);
    }
    swapped
}

pub fn insert_page(schema: &FormSchema, at: usize, page: FormSchemaPage) -> FormSchema {
    update_pages(schema, |mut pages| {
        let at = at.min(pages.len());
        pages.insert(at, page);
        pages
    })
}

pub fn remove_page(schema: &FormSchema, page_index: usize) -> FormSchema {
    update_pages(schema, |pages| remove_at(pages, page_index))
}

pub fn move_page(schema: &FormSchema, page_index: usize, direction: Direction) -> FormSchema {
    update_pages(schema, |pages| {
        safe_swap(&pages, page_index as isize, direction.neighbour(page_index))
    })
}

pub fn insert_element(
    schema: &FormSchema,
    page_index: usize,
    at: usize,
    element: FormSchemaElement,
) -> FormSchema {
    update_elements(schema, page_index, |mut elements| {
        let at = at.min(elements.len());
        elements.insert(at, element);
        elements
    })
}

pub fn remove_element(schema: &FormSchema, page_index: usize, element_index: usize) -> FormSchema {
    update_elements(schema, page_index, |elements| {
        remove_at(elements, element_index)
    })
}

pub fn move_element(
    schema: &FormSchema,
    page_index: usize,
    element_index: usize,
    direction: Direction,
) -> FormSchema {
    update_elements(schema, page_index, |elements| {
        safe_swap(
            &elements,
            element_index as isize,
            direction.neighbour(element_index),
        )
    })
}

fn in_bounds(len: usize, index: isize) -> Option<usize> {
    usize::try_from(index).ok().filter(|index| *index < len)
}

fn replace_at<T>(mut items: Vec<T>, index: usize, update: impl FnOnce(T) -> T) -> Vec<T> {
    if index < items.len() {
        let item = items.remove(index);
        items.insert(index, update(item));
    }
    items
}

fn remove_at<T>(mut items: Vec<T>, index: usize) -> Vec<T> {
    if index < items.len() {
        items.remove(index);
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{InputElement, StaticContent, TextInput};

    fn heading(text: &str) -> FormSchemaElement {
        FormSchemaElement::Heading(StaticContent { text: text.into() })
    }

    fn sample() -> FormSchema {
        FormSchema::new(vec![
            FormSchemaPage::new(vec![heading("a"), heading("b")]).with_title("one"),
            FormSchemaPage::new(vec![heading("c")]).with_title("two"),
        ])
    }

    fn titles(schema: &FormSchema) -> Vec<&str> {
        schema
            .pages
            .iter()
            .map(|page| page.title.as_deref().unwrap_or(""))
            .collect()
    }

    #[test]
    fn safe_swap_ignores_out_of_range_indices() {
        let items = vec!['a', 'b', 'c'];
        assert_eq!(safe_swap(&items, 0, -1), items);
        assert_eq!(safe_swap(&items, 2, 3), items);
        assert_eq!(safe_swap(&items, 0, 2), vec!['c', 'b', 'a']);
    }

    #[test]
    fn update_element_leaves_original_untouched() {
        let schema = sample();
        let before = schema.clone();
        let updated = update_element(&schema, 0, 0, |_| {
            FormSchemaElement::TextInput(TextInput {
                input: InputElement {
                    id: Some("name".into()),
                    ..Default::default()
                },
                ..Default::default()
            })
        });

        assert_eq!(schema, before);
        assert_eq!(updated.pages[0].elements[0].id(), Some("name"));
        assert_eq!(updated.pages[0].elements[1], before.pages[0].elements[1]);
        assert_eq!(updated.pages[1], before.pages[1]);
    }

    #[test]
    fn out_of_range_updates_are_no_ops() {
        let schema = sample();
        assert_eq!(update_page(&schema, 9, |_| FormSchemaPage::default()), schema);
        assert_eq!(update_element(&schema, 1, 5, |_| heading("x")), schema);
        assert_eq!(update_element(&schema, 7, 0, |_| heading("x")), schema);
        assert_eq!(remove_page(&schema, 2), schema);
        assert_eq!(remove_element(&schema, 0, 2), schema);
    }

    #[test]
    fn moving_pages_stops_at_the_boundaries() {
        let schema = sample();
        assert_eq!(titles(&move_page(&schema, 0, Direction::Up)), vec!["one", "two"]);
        assert_eq!(titles(&move_page(&schema, 1, Direction::Down)), vec!["one", "two"]);
        assert_eq!(titles(&move_page(&schema, 0, Direction::Down)), vec!["two", "one"]);
    }

    #[test]
    fn insert_and_move_elements() {
        let schema = insert_element(&sample(), 0, 1, heading("new"));
        let texts: Vec<_> = schema.pages[0]
            .elements
            .iter()
            .map(|element| match element {
                FormSchemaElement::Heading(content) => content.text.as_str(),
                _ => "",
            })
            .collect();
        assert_eq!(texts, vec!["a", "new", "b"]);

        let moved = move_element(&schema, 0, 2, Direction::Up);
        assert_eq!(moved.pages[0].elements[1], heading("b"));

        let appended = insert_page(&schema, 99, FormSchemaPage::default().with_title("three"));
        assert_eq!(titles(&appended), vec!["one", "two", "three"]);
    }
}
