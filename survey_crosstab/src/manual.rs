/*!

This is the long-form manual for `survey_crosstab` and `surveytab`.

## Input data

A survey export is a table: one row per respondent, one column per question
(or per item, for multi-select questions). The first row holds the column
names. Empty cells are unanswered questions.

The following formats are read by `surveytab`:
* `csv` Comma Separated Values, as exported by most survey providers
* `xlsx` Excel spreadsheets. If the workbook has several worksheets, the
  worksheet must be chosen with `excelWorksheetName` (or `--excel-worksheet-name`).

Whole numbers stored as floats in a spreadsheet (`34.0`) are read as `34`.

### Demographic columns

These columns are optional. When a column is missing, the corresponding
dimension is simply absent from the reports.

| Column            | Used for                                                     |
|-------------------|--------------------------------------------------------------|
| `Gender`          | Gender, taken as is                                          |
| `Age`             | Age, and the generation when there is no `Year Of Birth`     |
| `Year Of Birth`   | Generation                                                   |
| `US Region`       | Region, taken as is                                          |
| `UK Region`       | Region, after collapsing (see below), when there is no `US Region` |
| `Education Level` | Education, taken as is                                       |

Generations are computed from the year of birth, or from the reference year
minus the age:

| Generation  | Years of birth |
|-------------|----------------|
| Gen Z       | 1997 - 2012    |
| Millennial  | 1981 - 1996    |
| Gen X       | 1965 - 1980    |
| Baby Boomer | 1946 - 1964    |

Respondents born outside these ranges have no generation and do not appear in
the generation tables.

UK sub-regions are collapsed into 7 regions: London, Northern England,
Midlands (England), Southern England, Scotland, Wales and Northern Ireland.
Unknown sub-regions have no region.

### Questions

| Type     | Where the answers are                                                        |
|----------|------------------------------------------------------------------------------|
| `single` | one column, one answer per cell                                              |
| `multi`  | all the columns whose name contains the question, one selected item per cell |
| `matrix` | one column, cells like `Price: Agree \| Quality: Disagree`                   |
| `rank`   | one column, cells like `Price: 1 \| Quality: 2` (1 is the best)              |
| `slider` | one column of numbers                                                        |

In grid cells (`matrix` and `rank`), the statement ends at the first `:`.
Statements and values are trimmed.

## Output

Each question produces one CSV file with one section per dimension, in this
order: Overall, Gender, Generation, Age, Region, Education. Only the overall
section and the requested dimensions are included. A section without any
answer is not written.

Percentages are fractions between 0 and 1. They are computed against the
number of respondents of the segment who gave at least one answer to the
question, so that percentages of single questions sum to 1 in every segment.
A segment without any respondent has empty cells instead of percentages.

The layouts are:
* `single`, `multi`: `segment, Response, Count, Percentage`
* `matrix`: `segment, Statement, <one column per response>`
* `rank`: `segment, Statement, Average`
* `slider`: `segment, Rating, Count, Percentage`, with a final `Average` row

Every whole rating between the lowest and the highest rating observed gets a
row, even if nobody chose it.

### Rank averages

Ranks are flipped before being averaged: with N statements, rank `r` counts
as `N - r + 1`. Higher averages mean more important statements. With 3
statements, a statement always ranked first has an average of 3.

## Configuration

```text
{
  "outputSettings": {
    "reportName": "Tea survey",
    "outputDirectory": "reports",
    "referenceYear": 2024
  },
  "dataSources": [
    { "provider": "csv", "filePath": "export.csv" },
    { "provider": "xlsx", "filePath": "export2.xlsx", "excelWorksheetName": "Responses" }
  ],
  "questions": [
    { "question": "Do you like tea?", "type": "single", "outputFile": "tea.csv" },
    { "question": "Which teas (Select all)", "type": "multi", "outputFile": "teas.csv" }
  ],
  "rules": {
    "malformedResponses": "lenient",
    "unknownQuestions": "fail",
    "denominators": "respondents",
    "dimensions": ["gender", "generation", "region"]
  },
  "demographics": { "outputFile": "demographics.csv" }
}
```

Paths are relative to the configuration file. Several data sources are merged
in order, matching the columns by name.

Rules:
 - `malformedResponses`: `lenient` (default) drops the grid items that cannot
   be read and keeps the rest of the cell. `strict` sets aside the whole
   answer of the respondent, and reports it.
 - `unknownQuestions`: `fail` (default) stops at the first question that is
   not in the data. `skip` carries on with the next question.
 - `denominators`: `respondents` (default) or `allRecords`. With `allRecords`,
   every record of a segment counts in the denominator, answered or not. This
   reproduces older reports.
 - `dimensions`: among `gender`, `generation`, `age`, `region`, `education`.

When `referenceYear` is missing, the current year is used.

## Summary

`surveytab --summary <file or stdout>` writes a JSON summary of the report:
the number of respondents of every segment, the skipped sections and the
number of rejected answers of each question. With `--reference <file>`, the
summary is compared to a previous one and the differences are printed.

 */
